//! Viewport breakpoints

use http::HeaderMap;

/// Widest viewport treated as a phone
pub const MOBILE_MAX_WIDTH: u32 = 768;
/// Widest viewport treated as a tablet
pub const TABLET_MAX_WIDTH: u32 = 1024;

/// Client hint carrying the layout viewport width in CSS pixels
pub const VIEWPORT_WIDTH_HEADER: &str = "viewport-width";

/// Device class derived from the viewport width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// Up to 768 px
    Mobile,
    /// Up to 1024 px
    Tablet,
    /// Anything wider, or unknown
    #[default]
    Desktop,
}

impl Device {
    /// Classify a width in CSS pixels
    #[must_use]
    pub const fn from_width(width: u32) -> Self {
        if width <= MOBILE_MAX_WIDTH {
            Self::Mobile
        } else if width <= TABLET_MAX_WIDTH {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    /// Detect from the `vw` query value, then the `Viewport-Width` header
    ///
    /// Without either the page is laid out for a desktop.
    #[must_use]
    pub fn detect(query_width: Option<u32>, headers: &HeaderMap) -> Self {
        query_width
            .or_else(|| {
                headers
                    .get(VIEWPORT_WIDTH_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<f64>().ok())
                    .filter(|width| width.is_finite() && *width >= 0.0)
                    .map(whole_pixels)
            })
            .map_or(Self::Desktop, Self::from_width)
    }

    /// Lowercase name used in CSS classes
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }

    /// Narrow layouts drop secondary header items
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_pixels(width: f64) -> u32 {
    width.round().min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(320, Device::Mobile)]
    #[case(768, Device::Mobile)]
    #[case(769, Device::Tablet)]
    #[case(1024, Device::Tablet)]
    #[case(1025, Device::Desktop)]
    fn test_breakpoints(#[case] width: u32, #[case] device: Device) {
        assert_eq!(Device::from_width(width), device);
    }

    #[test]
    fn test_query_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert(VIEWPORT_WIDTH_HEADER, HeaderValue::from_static("1440"));
        assert_eq!(Device::detect(Some(600), &headers), Device::Mobile);
        assert_eq!(Device::detect(None, &headers), Device::Desktop);
    }

    #[test]
    fn test_fractional_header_and_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(VIEWPORT_WIDTH_HEADER, HeaderValue::from_static("800.4"));
        assert_eq!(Device::detect(None, &headers), Device::Tablet);

        headers.insert(VIEWPORT_WIDTH_HEADER, HeaderValue::from_static("wide"));
        assert_eq!(Device::detect(None, &headers), Device::Desktop);
    }
}
