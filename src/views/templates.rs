use handlebars::{handlebars_helper, Handlebars, TemplateError};
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

pub const ALERT_ABOVE: &str = "emails/alert_above";
pub const ALERT_BELOW: &str = "emails/alert_below";

handlebars_helper!(money: |v: f64| format!("{:.2}", v));

pub fn build_handlebars() -> Result<Hbs, TemplateError> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_helper("money", Box::new(money));

    // Alert emails
    hb.register_template_string(
        ALERT_ABOVE,
        include_str!("../../templates/emails/alert_above.hbs"),
    )?;
    hb.register_template_string(
        ALERT_BELOW,
        include_str!("../../templates/emails/alert_below.hbs"),
    )?;

    Ok(Arc::new(hb))
}
