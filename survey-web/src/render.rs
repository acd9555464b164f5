//! HTML page rendering
//!
//! Templates are compiled into the binary and rendered with tera
//! (auto-escaping enabled for `.html` names).

use axum::response::Html;
use survey_common::db::User;
use tera::{Context, Tera};

use crate::error::ApiResult;
use crate::session::Flash;

const TEMPLATES: [(&str, &str); 10] = [
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("sign_up.html", include_str!("../templates/sign_up.html")),
    ("quiz_list.html", include_str!("../templates/quiz_list.html")),
    ("quiz.html", include_str!("../templates/quiz.html")),
    (
        "admin_questionnaires.html",
        include_str!("../templates/admin_questionnaires.html"),
    ),
    ("admin_create.html", include_str!("../templates/admin_create.html")),
    ("admin_upload.html", include_str!("../templates/admin_upload.html")),
    ("admin_results.html", include_str!("../templates/admin_results.html")),
];

/// Compile the embedded templates
pub fn load_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.to_vec())?;
    Ok(tera)
}

/// Context shared by every page: the current user (if any) and pending flashes
pub fn base_context(user: Option<&User>, flashes: &[Flash]) -> Context {
    let mut context = Context::new();
    context.insert("user", &user);
    context.insert("flashes", flashes);
    context
}

pub fn render(templates: &Tera, name: &str, context: &Context) -> ApiResult<Html<String>> {
    Ok(Html(templates.render(name, context)?))
}
