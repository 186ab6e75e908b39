//! Server-rendered pages and the view logic behind the protected one.

use std::collections::HashMap;

use handlebars::Handlebars;
use serde_json::json;

use crate::error::Error;
use crate::token::IdentityClaims;

/// Profile attribute holding the JSON-serialized list of picked foods.
pub const FOOD_SELECTION_ATTRIBUTE: &str = "foodSelection";

/// Profile attribute holding the welcome bonus.
pub const POINTS_ATTRIBUTE: &str = "points";

/// Bonus granted once, on the first identified login.
pub const POINTS_BONUS: &str = "150";

/// Shown when the picture claim is absent.
pub const DEFAULT_PICTURE: &str = "/images/anonymous.svg";

pub const GUEST_USER_HINT: &str = "A guest user started using the app. App ID created a new anonymous profile, where the user’s selections can be stored.";
pub const RETURNING_USER_HINT: &str = "An identified user returned to the app with the same identity. The app accesses his identified profile and the previous selections that he made.";
pub const NEW_USER_HINT: &str = "An identified user logged in for the first time. Now when he logs in with the same credentials from any device or web client, the app will show his same profile and selections.";

pub const TOP_HINT_GUEST: &str = "Login to get a gift >";
pub const TOP_HINT_POINTS: &str = "You got 150 points go get a pizza";

const TOP_HINT_LOGIN_ACTION: &str = r#" window.location.href = "/login";"#;

/// Handlebars registry with every page template compiled in.
#[derive(Debug)]
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    /// Registers the embedded templates.
    ///
    /// # Errors
    ///
    /// Returns the handlebars error for the first template that fails to
    /// compile.
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        for (name, source) in [
            ("protected", include_str!("../templates/protected.hbs")),
            ("token", include_str!("../templates/token.hbs")),
            ("userInfo", include_str!("../templates/userInfo.hbs")),
            ("error", include_str!("../templates/error.hbs")),
            ("infoError", include_str!("../templates/infoError.hbs")),
        ] {
            registry.register_template_string(name, source)?;
        }
        Ok(Self { registry })
    }

    /// Renders `template` with `data`.
    ///
    /// # Errors
    ///
    /// Returns the handlebars error when the template is unknown or the
    /// render fails.
    pub fn render(
        &self,
        template: &str,
        data: &serde_json::Value,
    ) -> Result<String, handlebars::RenderError> {
        self.registry.render(template, data)
    }
}

/// Name shown on the protected page. First of: the name claim, the local
/// part of the email claim, or "Guest".
#[must_use]
pub fn display_name(claims: &IdentityClaims) -> String {
    if let Some(name) = claims.name.as_deref() {
        if !name.is_empty() {
            return name.to_owned();
        }
    }
    if let Some(email) = claims.email.as_deref() {
        let local = match email.find('@') {
            Some(at) => &email[..at],
            None => email,
        };
        if !local.is_empty() {
            return local.to_owned();
        }
    }
    "Guest".to_owned()
}

/// Reads the stored food selection. An absent or empty attribute is an empty
/// selection; an attribute that is not a JSON string list is an error.
///
/// # Errors
///
/// Returns `Error::Json` when the stored attribute fails to parse.
pub fn parse_selection(attributes: &HashMap<String, String>) -> Result<Vec<String>, Error> {
    match attributes.get(FOOD_SELECTION_ATTRIBUTE) {
        Some(raw) if !raw.is_empty() => Ok(serde_json::from_str(raw)?),
        _ => Ok(Vec::new()),
    }
}

/// Set-toggle on the selection: removes every occurrence of `item`, or
/// appends it when it was not there.
pub fn toggle_item(selection: &mut Vec<String>, item: &str) {
    let len_before = selection.len();
    selection.retain(|picked| picked != item);
    if selection.len() == len_before {
        selection.push(item.to_owned());
    }
}

/// Whether this login should be greeted with the welcome bonus: an
/// identified subject with no recorded points yet.
#[must_use]
pub fn is_first_login(claims: &IdentityClaims, attributes: &HashMap<String, String>) -> bool {
    !claims.is_anonymous()
        && attributes
            .get(POINTS_ATTRIBUTE)
            .is_none_or(|points| points.is_empty())
}

/// Picks the hint paragraph for the protected page.
#[must_use]
pub fn hint_text(guest: bool, first_login: bool) -> &'static str {
    if guest {
        GUEST_USER_HINT
    } else if first_login {
        NEW_USER_HINT
    } else {
        RETURNING_USER_HINT
    }
}

/// Assembles the data the protected template renders.
///
/// # Errors
///
/// Returns `Error::Json` when the selection fails to serialize.
pub fn protected_page_data(
    claims: &IdentityClaims,
    selection: &[String],
    first_login: bool,
) -> Result<serde_json::Value, Error> {
    let guest = claims.is_anonymous();
    let picture = match claims.picture.as_deref() {
        Some(picture) if !picture.is_empty() => picture,
        _ => DEFAULT_PICTURE,
    };
    let (top_hint, top_image, top_action) = if guest {
        (TOP_HINT_GUEST, "hidden", TOP_HINT_LOGIN_ACTION)
    } else {
        (TOP_HINT_POINTS, "visible", ";")
    };

    Ok(json!({
        "name": display_name(claims),
        "picture": picture,
        "food_selection": serde_json::to_string(selection)?,
        "top_hint_text": top_hint,
        "top_image_visibility": top_image,
        "top_hint_click_action": top_action,
        "hint_text": hint_text(guest, first_login),
        "is_guest": guest,
        "is_cloud_directory": claims.is_cloud_directory(),
    }))
}
