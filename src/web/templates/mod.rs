use askama::Template;
use axum::{
    response::{Html, IntoResponse, Response},
    http::StatusCode,
};

// Make askama templates work with axum
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!("Failed to render template: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to render page",
                ).into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "payment/success.html")]
pub struct PaymentSuccessTemplate {
    pub order_id: String,
    pub amount: String,
    pub currency: String,
    pub registration_numbers: Vec<String>,
}

#[derive(Template)]
#[template(path = "payment/processing.html")]
pub struct PaymentProcessingTemplate {
    pub order_id: String,
    pub refresh_url: String,
    pub refresh_seconds: u32,
}

#[derive(Template)]
#[template(path = "payment/failed.html")]
pub struct PaymentFailedTemplate {
    pub order_id: String,
    pub reason: Option<String>,
}

#[derive(Template)]
#[template(path = "payment/error.html")]
pub struct PaymentErrorTemplate {
    pub message: String,
}
