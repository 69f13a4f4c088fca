/// Page/limit clamping for list endpoints.
pub mod pagination;
/// Pure parser helpers.
pub mod parse;
