use crate::parse::parse_leading_int;

/// A validated 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Build a page request from raw query values.
    ///
    /// `page` floors at 1. `page_size` falls back to `default_page_size` when absent,
    /// non-numeric or zero, and is then clamped into `1..=max_page_size`.
    pub fn from_query(
        page: Option<&str>,
        page_size: Option<&str>,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        let max_page_size = max_page_size.max(1);

        let page = page
            .and_then(parse_leading_int)
            .filter(|value| *value != 0)
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX));

        let page_size = page_size
            .and_then(parse_leading_int)
            .filter(|value| *value != 0)
            .unwrap_or(i64::from(default_page_size))
            .clamp(1, i64::from(max_page_size));

        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            page_size: u32::try_from(page_size).unwrap_or(max_page_size),
        }
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// Clamp a plain `limit` query value into `1..=max`, using `default` when it is
/// absent, non-numeric or zero.
pub fn clamp_limit(raw: Option<&str>, default: u32, max: u32) -> u32 {
    let max = max.max(1);
    let value = raw
        .and_then(parse_leading_int)
        .filter(|value| *value != 0)
        .unwrap_or(i64::from(default))
        .clamp(1, i64::from(max));

    u32::try_from(value).unwrap_or(max)
}

/// Total number of pages needed to show `total` rows, never less than one.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total.div_ceil(page_size).max(1)
}

#[cfg(test)]
mod tests {
    use super::{PageRequest, clamp_limit, total_pages};

    const DEFAULT: u32 = 50;
    const MAX: u32 = 200;

    fn request(page: Option<&str>, page_size: Option<&str>) -> PageRequest {
        PageRequest::from_query(page, page_size, DEFAULT, MAX)
    }

    #[test]
    fn defaults_when_absent() {
        assert_eq!(
            request(None, None),
            PageRequest {
                page: 1,
                page_size: 50
            }
        );
    }

    #[test]
    fn page_floors_at_one() {
        assert_eq!(request(Some("0"), None).page, 1);
        assert_eq!(request(Some("-4"), None).page, 1);
        assert_eq!(request(Some("abc"), None).page, 1);
        assert_eq!(request(Some("3"), None).page, 3);
    }

    #[test]
    fn page_size_defaults_then_clamps() {
        assert_eq!(request(None, Some("abc")).page_size, 50);
        assert_eq!(request(None, Some("0")).page_size, 50);
        assert_eq!(request(None, Some("-5")).page_size, 1);
        assert_eq!(request(None, Some("25")).page_size, 25);
        assert_eq!(request(None, Some("10000")).page_size, 200);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(request(Some("1"), Some("20")).offset(), 0);
        assert_eq!(request(Some("3"), Some("20")).offset(), 40);
        assert_eq!(request(Some("2"), Some("200")).limit(), 200);
    }

    #[test]
    fn limit_clamping() {
        assert_eq!(clamp_limit(None, 5, 100), 5);
        assert_eq!(clamp_limit(Some("0"), 5, 100), 5);
        assert_eq!(clamp_limit(Some("500"), 5, 100), 100);
        assert_eq!(clamp_limit(Some("-1"), 5, 100), 1);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 50), 1);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(10, 0), 10);
    }
}
