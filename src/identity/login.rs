/// Default user role written to new `users/{uid}` profiles.
pub const DEFAULT_ROLE: &str = "user";

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Message shown on the login form for a Firebase Auth error.
///
/// Known codes get a friendly sentence. Anything else shows the provider's
/// own message, or a generic one when that is blank.
pub fn auth_error_message(code: &str, provider_message: Option<&str>) -> String {
    let known = match code {
        "auth/invalid-email" => Some("That email address looks invalid."),
        "auth/user-not-found" => Some("No account found for that email."),
        "auth/wrong-password" => Some("Incorrect password."),
        "auth/email-already-in-use" => Some("That email is already in use. Try logging in."),
        "auth/weak-password" => Some("Password is too weak. Use at least 6 characters."),
        _ => None,
    };
    known
        .or(provider_message.map(str::trim).filter(|message| !message.is_empty()))
        .unwrap_or(GENERIC_FAILURE)
        .to_string()
}
