//! `tvlink send` and `tvlink actions`.

use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;

use tvlink_core::{Action, ActionName, ActionParams, ConnectionState};

use crate::cli::SendArgs;
use crate::commands::{LINGER, Resolved, finish};
use crate::error::CliError;
use crate::host::ConsoleHost;

pub async fn handle(args: SendArgs, resolved: &Resolved) -> Result<(), CliError> {
    let params = parse_params(&args.params)?;
    let action = Action::parse(&args.action, &params)?;
    if let Action::Other { name, .. } = action {
        return Err(CliError::UnknownAction { name });
    }

    let session = resolved.start_session(Arc::new(ConsoleHost::quiet()))?;

    let mut state = session.connection_state();
    let connected = tokio::time::timeout(Duration::from_secs(args.wait), async {
        state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .map(|_| ())
    })
    .await;
    match connected {
        Ok(Ok(())) => {}
        Ok(Err(_)) => return Err(CliError::SessionClosed),
        Err(_) => {
            finish(session).await;
            return Err(CliError::Timeout {
                host: resolved.config.host.clone().unwrap_or_default(),
                seconds: args.wait,
            });
        }
    }

    session.dispatch(action);
    tokio::time::sleep(LINGER).await;
    finish(session).await;
    Ok(())
}

/// Split `key=value` arguments.
pub(crate) fn parse_params(raw: &[String]) -> Result<ActionParams, CliError> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| CliError::Validation {
                    field: "parameter".into(),
                    reason: format!("expected KEY=VALUE, got '{pair}'"),
                })
        })
        .collect()
}

/// Print every action name with its parameters.
pub fn list_actions() {
    for name in ActionName::iter() {
        let usage = match name {
            ActionName::VolumeIncrease | ActionName::VolumeDecrease => "amount=<0..1>",
            ActionName::VolumeRelative | ActionName::VolumeSet => "value=<0..1>",
            ActionName::VolumeSetDecibel => "db=<level>",
            ActionName::MuteSet | ActionName::MuteToggle => "state=<true|false>",
            ActionName::Notify => "text=<message>",
            _ => "",
        };
        println!("{name:<20}{usage}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn params_split_on_first_equals() {
        let raw = vec!["text=a=b".to_owned(), "amount=0.1".to_owned()];
        let params = parse_params(&raw).unwrap();
        assert_eq!(params.get("text"), Some("a=b"));
        assert_eq!(params.get("amount"), Some("0.1"));
    }

    #[test]
    fn malformed_param_is_rejected() {
        assert!(parse_params(&["loud".to_owned()]).is_err());
        assert!(parse_params(&["=1".to_owned()]).is_err());
    }
}
