use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::{
    health, login, profile, register, reset, session, verify, ErrorResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        register::register,
        login::login,
        verify::verify_code,
        verify::resend_code,
        reset::forgot_password,
        reset::reset_password,
        profile::update_profile,
        session::validate_token,
    ),
    components(schemas(
        ErrorResponse,
        register::RegisterRequest,
        register::RegisterResponse,
        login::LoginRequest,
        login::LoginResponse,
        verify::VerifyCodeRequest,
        verify::VerifyCodeResponse,
        verify::ResendCodeResponse,
        reset::ForgotPasswordRequest,
        reset::ResetPasswordRequest,
        reset::MessageResponse,
        profile::UpdateProfileRequest,
        profile::ProfileResponse,
        session::SessionResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "account", description = "Registration and sign-in"),
        (name = "verification", description = "Email verification codes"),
        (name = "reset", description = "Password reset"),
        (name = "profile", description = "Profile updates"),
        (name = "session", description = "Session token validation"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("opaque")
                        .build(),
                ),
            );
        }
    }
}
