//! Fault classification command

use tunnelwatch_core::config::DEFAULT_SUPPORT_URL;
use tunnelwatch_core::error::TunnelwatchError;
use tunnelwatch_core::vpn::{classify, FaultAction};

/// Run the classify command
pub fn run_classify(code: &str, description: &str, json: bool) -> Result<(), TunnelwatchError> {
    let (fault, action) = classify(code, description);

    if json {
        let output = serde_json::json!({
            "fault": fault,
            "code": fault.code(),
            "action": action,
            "retryable": action.is_retryable(),
            "requires_acknowledgement": action.requires_acknowledgement(),
            "message": fault.message(),
            "support_link": fault.shows_support_link(),
            "diagnostic": fault.diagnostic(),
        });
        println!("{}", output);
        return Ok(());
    }

    println!("Fault:        {}", fault);
    println!("Action:       {}", describe(action));
    println!("Retryable:    {}", yes_no(action.is_retryable()));
    println!("Acknowledge:  {}", yes_no(action.requires_acknowledgement()));
    println!("Message:      {}", fault.message());
    if fault.shows_support_link() {
        println!("Support:      {}", DEFAULT_SUPPORT_URL);
    }
    if let Some(diagnostic) = fault.diagnostic() {
        println!("Diagnostic:   {}", diagnostic);
    }

    Ok(())
}

fn describe(action: FaultAction) -> &'static str {
    match action {
        FaultAction::PromptCredentialError => "prompt credential error",
        FaultAction::ShowBlockingDialog => "show blocking dialog",
        FaultAction::ForceDisconnectAndPromptError => "force disconnect and prompt error",
        FaultAction::SilentlyRecordOnly => "silently record only",
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
