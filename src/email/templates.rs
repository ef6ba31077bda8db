use askama::Template;

/// One confirmed entry as it appears in notification emails.
#[derive(Debug, Clone)]
pub struct RegistrationSummary {
    pub registration_number: String,
    pub competition_title: String,
    pub registration_type_name: String,
    pub participant_label: String,
    pub country: String,
    pub team_members: Vec<String>,
    pub amount: String,
}

#[derive(Template)]
#[template(path = "email/confirmation.html")]
pub struct ConfirmationEmail<'a> {
    pub recipient_name: &'a str,
    pub order_id: &'a str,
    pub entry: &'a RegistrationSummary,
}

#[derive(Template)]
#[template(path = "email/receipt.html")]
pub struct ReceiptEmail<'a> {
    pub recipient_name: &'a str,
    pub order_id: &'a str,
    pub entry: &'a RegistrationSummary,
    pub currency: &'a str,
    pub total: &'a str,
    pub paid_on: &'a str,
    pub gateway_reference: Option<&'a str>,
    pub payment_method: &'a str,
}

#[derive(Template)]
#[template(path = "email/guidelines.html")]
pub struct GuidelinesEmail<'a> {
    pub recipient_name: &'a str,
    pub registration_number: &'a str,
    pub competition_title: &'a str,
    pub competition_description: &'a str,
    pub guidelines_url: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/consolidated.html")]
pub struct ConsolidatedEmail<'a> {
    pub recipient_name: &'a str,
    pub order_id: &'a str,
    pub entries: &'a [RegistrationSummary],
    pub currency: &'a str,
    pub total: &'a str,
    pub paid_on: &'a str,
}
