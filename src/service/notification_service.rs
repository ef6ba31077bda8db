use std::sync::Arc;

use askama::Template;

use crate::{
    domain::*,
    email::{
        templates::{
            ConfirmationEmail, ConsolidatedEmail, GuidelinesEmail, ReceiptEmail,
            RegistrationSummary,
        },
        EmailMessage, EmailSender,
    },
    error::{AppError, Result},
    payments::format_amount,
    repository::{CompetitionRepository, UserRepository},
};

/// Sends the post-payment emails for a set of confirmed registrations.
///
/// A single registration gets confirmation, receipt and guidelines emails;
/// a multi-entry order gets one consolidated email. Delivery failures are
/// logged and never reach the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn EmailSender>,
    user_repo: Arc<dyn UserRepository>,
    competition_repo: Arc<dyn CompetitionRepository>,
    deliver_inline: bool,
}

impl NotificationDispatcher {
    pub fn new(
        mailer: Arc<dyn EmailSender>,
        user_repo: Arc<dyn UserRepository>,
        competition_repo: Arc<dyn CompetitionRepository>,
        deliver_inline: bool,
    ) -> Self {
        Self {
            mailer,
            user_repo,
            competition_repo,
            deliver_inline,
        }
    }

    pub async fn dispatch(&self, payment: Payment, registrations: Vec<Registration>) {
        if registrations.is_empty() {
            return;
        }

        if self.deliver_inline {
            self.deliver(&payment, &registrations).await;
        } else {
            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.deliver(&payment, &registrations).await;
            });
        }
    }

    async fn deliver(&self, payment: &Payment, registrations: &[Registration]) {
        let messages = match self.build_messages(payment, registrations).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(
                    order_id = %payment.order_id,
                    "Failed to prepare registration emails: {:?}",
                    e
                );
                return;
            }
        };

        for message in messages {
            let subject = message.subject.clone();
            match self.mailer.send(message).await {
                Ok(_) => tracing::debug!(order_id = %payment.order_id, "Sent email: {}", subject),
                Err(e) => tracing::error!(
                    order_id = %payment.order_id,
                    "Failed to send email '{}': {:?}",
                    subject,
                    e
                ),
            }
        }
    }

    pub async fn build_messages(
        &self,
        payment: &Payment,
        registrations: &[Registration],
    ) -> Result<Vec<EmailMessage>> {
        if registrations.is_empty() {
            return Ok(Vec::new());
        }

        let user = self
            .user_repo
            .find_by_id(payment.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", payment.user_id)))?;

        let paid_on = payment
            .completed_at
            .unwrap_or(payment.updated_at)
            .format("%B %d, %Y")
            .to_string();
        let total = format_amount(payment.amount_cents);
        let recipient_name = user.first_name().to_string();

        let mut entries = Vec::with_capacity(registrations.len());
        let mut competitions = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let competition = self
                .competition_repo
                .find_by_id(registration.competition_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Competition not found".to_string()))?;
            let registration_type = self
                .competition_repo
                .find_registration_type(registration.registration_type_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Registration type not found".to_string()))?;

            entries.push(summarize(&user, registration, &competition, &registration_type));
            competitions.push(competition);
        }

        if entries.len() > 1 {
            let html_body = ConsolidatedEmail {
                recipient_name: &recipient_name,
                order_id: &payment.order_id,
                entries: &entries,
                currency: &payment.currency,
                total: &total,
                paid_on: &paid_on,
            }
            .render()?;

            return Ok(vec![EmailMessage {
                to: user.email.clone(),
                subject: format!("Your {} competition registrations are confirmed", entries.len()),
                html_body,
            }]);
        }

        let entry = &entries[0];
        let competition = &competitions[0];

        let confirmation = ConfirmationEmail {
            recipient_name: &recipient_name,
            order_id: &payment.order_id,
            entry,
        }
        .render()?;

        let receipt = ReceiptEmail {
            recipient_name: &recipient_name,
            order_id: &payment.order_id,
            entry,
            currency: &payment.currency,
            total: &total,
            paid_on: &paid_on,
            gateway_reference: payment.gateway_payment_id.as_deref(),
            payment_method: payment
                .gateway_method
                .as_deref()
                .unwrap_or(payment.payment_method.as_str()),
        }
        .render()?;

        let guidelines = GuidelinesEmail {
            recipient_name: &recipient_name,
            registration_number: &entry.registration_number,
            competition_title: &competition.title,
            competition_description: &competition.description,
            guidelines_url: competition.guidelines_url.as_deref(),
        }
        .render()?;

        Ok(vec![
            EmailMessage {
                to: user.email.clone(),
                subject: format!("Registration confirmed: {}", competition.title),
                html_body: confirmation,
            },
            EmailMessage {
                to: user.email.clone(),
                subject: format!("Payment receipt for order {}", payment.order_id),
                html_body: receipt,
            },
            EmailMessage {
                to: user.email.clone(),
                subject: format!("{} competition guidelines", competition.title),
                html_body: guidelines,
            },
        ])
    }
}

fn summarize(
    user: &User,
    registration: &Registration,
    competition: &Competition,
    registration_type: &RegistrationType,
) -> RegistrationSummary {
    let participant_label = match registration.participant_type {
        ParticipantType::Individual => user.full_name.clone(),
        ParticipantType::Team => registration
            .team_name
            .clone()
            .unwrap_or_else(|| "Team entry".to_string()),
    };

    RegistrationSummary {
        registration_number: registration.registration_number.clone(),
        competition_title: competition.title.clone(),
        registration_type_name: registration_type.name.clone(),
        participant_label,
        country: registration.country.clone(),
        team_members: registration
            .team_members
            .iter()
            .map(|member| member.name.clone())
            .collect(),
        amount: format_amount(registration.amount_paid_cents),
    }
}
