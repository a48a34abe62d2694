//! Status command - check that the network answers

use anyhow::Result;
use serde_json::json;

use super::output::Message;
use super::Context;

pub fn execute(ctx: &Context) -> Result<()> {
    let services = ctx.services()?;
    let status = services.status();
    let network = status.network().to_string();

    let message = match status.ping() {
        Ok(()) => Message::new(
            format!("Status:  ONLINE\nNetwork: {}", network),
            json!({ "network": network, "online": true }),
        ),
        Err(e) => Message::new(
            format!("Status:  OFFLINE\nNetwork: {}\nError:   {}", network, e),
            json!({ "network": network, "online": false, "error": e.to_string() }),
        ),
    };
    ctx.emit(&message)
}
