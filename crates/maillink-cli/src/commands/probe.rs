//! `maillink probe` -- print today's newest sign-in link, send nothing.
//!
//! Needs only the mailbox settings.

use maillink_services::lookup::{NO_LINK_REPLY, NO_MESSAGE_REPLY};
use maillink_services::{LinkFinder, LinkLookup, local_today};
use maillink_types::{Environment, MailboxConfig, SubjectFilter, resolve_base_dir};

use super::{link_pattern, mailbox_connector};

pub async fn run(env: &dyn Environment) -> anyhow::Result<()> {
    let mailbox = MailboxConfig::from_env(env)?;
    let connector = mailbox_connector(&mailbox, &resolve_base_dir(env))?;
    let finder = LinkFinder::new(connector, SubjectFilter::from_env(env), link_pattern()?);

    match finder.latest(local_today()).await {
        LinkLookup::Found { uid, subject, link } => {
            println!("Subject: {subject} (uid {uid})");
            println!("Link:    {link}");
        }
        LinkLookup::NoLink { uid, subject } => {
            println!("Subject: {subject} (uid {uid})");
            println!("{NO_LINK_REPLY}");
        }
        LinkLookup::NoMessage => println!("{NO_MESSAGE_REPLY}"),
        LinkLookup::Failed(reason) => anyhow::bail!(reason),
    }
    Ok(())
}
