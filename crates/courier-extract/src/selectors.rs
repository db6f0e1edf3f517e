//! Locators for every control the workflow touches on the portal.

use courier_browser::Locator;
use courier_core::ExtractionConfig;

/// Portal controls, grouped by step.
#[derive(Debug, Clone)]
pub struct PortalSelectors {
    pub login_form: Locator,
    pub login_email: Locator,
    pub login_password: Locator,
    /// Tried in order; Enter in the password field when none is present
    pub login_submit: Vec<Locator>,

    /// Value typed into the selection widgets
    pub filter_value: String,
    /// Filter value already shown as selected
    pub filter_selected: Locator,
    /// Candidate selection widgets, in document order
    pub filter_widgets: Locator,
    pub filter_search: Locator,
    pub filter_option: Locator,

    pub search_button: Locator,
    /// Export control scoped to the labelled panel
    pub export_button: Locator,
    pub decline_button: Locator,
    pub downloads_confirm: Locator,

    /// Tried in order against the results table
    pub download_links: Vec<Locator>,
}

impl PortalSelectors {
    pub fn new(filter_value: &str, panel_label: &str) -> Self {
        let panel = Locator::css("div.intro-y.box").with_text(panel_label);

        Self {
            login_form: Locator::css("#login-form"),
            login_email: Locator::css("#input-email"),
            login_password: Locator::css("#input-password"),
            login_submit: vec![
                Locator::css("button").with_text("Entrar"),
                Locator::css("button[type=\"submit\"]"),
            ],

            filter_value: filter_value.to_string(),
            filter_selected: Locator::css(".select2-selection__rendered").with_text(filter_value),
            filter_widgets: Locator::css(".select2 .select2-selection"),
            filter_search: Locator::css("input.select2-search__field"),
            filter_option: Locator::css(".select2-results__option").with_text(filter_value),

            search_button: Locator::css("#btnSearch"),
            export_button: Locator::css(
                "button[onclick*=\"operationDataExport('card_1'\"], button#xlsxExport",
            )
            .within(panel),
            decline_button: Locator::css("button.swal2-deny").with_text("Não"),
            downloads_confirm: Locator::css("button.swal2-confirm")
                .with_text("Acessar Central de Downloads"),

            download_links: vec![
                Locator::css("table tbody tr:first-child a[href$=\".xlsx\"]"),
                Locator::css("table tr:first-child a[href$=\".xlsx\"]"),
                Locator::css("td.text-center a[href$=\".xlsx\"]"),
                Locator::css("a:has(i.fa-download)"),
            ],
        }
    }
}

impl From<&ExtractionConfig> for PortalSelectors {
    fn from(config: &ExtractionConfig) -> Self {
        Self::new(&config.filter_value, &config.panel_label)
    }
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}
