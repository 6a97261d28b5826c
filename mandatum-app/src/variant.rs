//! Build-variant naming.
//!
//! The display name and bundle identifier vary by a build-variant flag, each
//! appending a fixed suffix. Resolved once at startup from
//! `MANDATUM_APP_VARIANT`; unknown or missing values mean production.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVariant {
    Development,
    Preview,
    Production,
}

impl BuildVariant {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("MANDATUM_APP_VARIANT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("development") => Self::Development,
            Some("preview") => Self::Preview,
            _ => Self::Production,
        }
    }

    pub fn display_name(self, base: &str) -> String {
        match self {
            Self::Development => format!("{base} (Dev)"),
            Self::Preview => format!("{base} (Preview)"),
            Self::Production => base.to_string(),
        }
    }

    pub fn bundle_identifier(self, base: &str) -> String {
        match self {
            Self::Development => format!("{base}.dev"),
            Self::Preview => format!("{base}.preview"),
            Self::Production => base.to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Preview => "preview",
            Self::Production => "production",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_variant_appends_its_fixed_suffixes() {
        let dev = BuildVariant::Development;
        assert_eq!(dev.display_name("Mandatum"), "Mandatum (Dev)");
        assert_eq!(
            dev.bundle_identifier("dev.latticelabs.mandatum"),
            "dev.latticelabs.mandatum.dev"
        );

        let preview = BuildVariant::Preview;
        assert_eq!(preview.display_name("Mandatum"), "Mandatum (Preview)");
        assert_eq!(
            preview.bundle_identifier("dev.latticelabs.mandatum"),
            "dev.latticelabs.mandatum.preview"
        );
    }

    #[test]
    fn production_is_the_untouched_base() {
        let prod = BuildVariant::Production;
        assert_eq!(prod.display_name("Mandatum"), "Mandatum");
        assert_eq!(
            prod.bundle_identifier("dev.latticelabs.mandatum"),
            "dev.latticelabs.mandatum"
        );
    }

    #[test]
    fn unknown_values_fall_back_to_production() {
        assert_eq!(BuildVariant::parse(None), BuildVariant::Production);
        assert_eq!(BuildVariant::parse(Some("")), BuildVariant::Production);
        assert_eq!(BuildVariant::parse(Some("staging")), BuildVariant::Production);
        assert_eq!(
            BuildVariant::parse(Some("development")),
            BuildVariant::Development
        );
    }
}
