//! `whoami` handler.

use sentinel_api::UserInfo;
use sentinel_core::HttpSource;

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

fn detail(user: &UserInfo) -> String {
    let mut lines = vec![
        format!("Username:  {}", user.username),
        format!("Role:      {}", user.role),
    ];
    if let Some(ref email) = user.email {
        lines.push(format!("Email:     {email}"));
    }
    lines.join("\n")
}

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    if session.feed.auth.is_none() {
        return Err(CliError::NoCredentials {
            profile: session.profile_name.clone(),
        });
    }

    let source = HttpSource::from_config(&session.feed).map_err(|e| session.error(e))?;
    let user = source.whoami().await.map_err(|e| session.error(e))?;

    let out = output::render_single(global.output, &user, detail, |u| u.username.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
