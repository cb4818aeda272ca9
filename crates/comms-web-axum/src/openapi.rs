//! OpenAPI document for the gateway, generated from the handler annotations.

use utoipa::OpenApi;

use crate::HealthResponse;
use comms_web_generic::{EmailRequest, SmsRequest, WhatsAppRequest};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "commskit gateway",
        description = "Email, SMS and WhatsApp template dispatch over Azure Communication Services"
    ),
    paths(
        crate::send_email,
        crate::send_sms,
        crate::send_whatsapp_message,
        crate::health,
    ),
    components(schemas(EmailRequest, SmsRequest, WhatsAppRequest, HealthResponse)),
    tags(
        (name = "messaging", description = "Outbound notifications"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
