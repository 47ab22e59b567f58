//! Commands that go through the backend.

use std::path::Path;

use ab_catalog::ReferenceCatalog;
use ab_community::{Community, ToggleOutcome};
use ab_core::{BlobUpload, Profile};
use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::Commands;

/// Makes sure the signed-in actor has a profile before a mutation.
async fn signed_in_profile(community: &Community) -> Result<Profile> {
    let actor = community.client().require_actor().await?;
    Ok(community.profiles().ensure_profile(&actor).await?)
}

fn report(what: &str, outcome: ToggleOutcome) {
    match outcome {
        ToggleOutcome::Inserted => println!("{what}."),
        ToggleOutcome::AlreadyPresent => println!("Already done; nothing changed."),
    }
}

pub async fn run(
    community: &Community,
    catalog: &dyn ReferenceCatalog,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Feed => feed(community, catalog).await,
        Commands::Post { text, image } => {
            signed_in_profile(community).await?;
            let upload = match image {
                Some(path) => Some(read_upload(&path).await?),
                None => None,
            };
            let view = community.posts().create_post_with_image(&text, upload).await?;
            println!("Posted {}", view.post.id);
            Ok(())
        }
        Commands::Like { post_id } => {
            signed_in_profile(community).await?;
            report("Liked", community.posts().like_post(post_id).await?);
            Ok(())
        }
        Commands::Comment { post_id, text } => {
            signed_in_profile(community).await?;
            let comment = community.posts().add_comment(post_id, &text).await?;
            println!("Commented {}", comment.id);
            Ok(())
        }
        Commands::Join { group_id } => {
            signed_in_profile(community).await?;
            report("Joined", community.groups().join_group(group_id).await?);
            Ok(())
        }
        Commands::Attend { event_id } => {
            signed_in_profile(community).await?;
            report("Attending", community.events().attend_event(event_id).await?);
            Ok(())
        }
        _ => bail!("not a community command"),
    }
}

async fn read_upload(path: &Path) -> Result<BlobUpload> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(BlobUpload::new(file_name, data))
}

async fn feed(community: &Community, catalog: &dyn ReferenceCatalog) -> Result<()> {
    let profile = match community.client().current_actor().await? {
        Some(actor) => Some(community.profiles().ensure_profile(&actor).await?),
        None => None,
    };
    if let Some(p) = &profile {
        println!("Signed in as {}", p.username);
        let embassy = p
            .location
            .as_deref()
            .and_then(|loc| catalog.embassy_for_location(loc));
        if let Some(contact) = embassy {
            println!("Nearest embassy: {} ({})", contact.address, contact.phone);
        }
    }

    let (post_feed, story_feed, group_feed, event_feed) = (
        community.posts(),
        community.stories(),
        community.groups(),
        community.events(),
    );
    let (posts, stories, groups, events) = tokio::join!(
        post_feed.refresh(),
        story_feed.refresh(),
        group_feed.refresh(),
        event_feed.refresh()
    );
    info!(
        posts = posts.len(),
        stories = stories.len(),
        groups = groups.len(),
        events = events.len(),
        "feed loaded"
    );

    println!("== Stories ({})", stories.len());
    for s in &stories {
        let who = s.author.as_ref().map_or("someone", |a| a.username.as_str());
        println!("  {who} until {}", s.story.expires_at.format("%Y-%m-%d %H:%M"));
    }
    println!("== Posts ({})", posts.len());
    for p in &posts {
        let who = p.author.as_ref().map_or("someone", |a| a.username.as_str());
        let liked = if p.liked_by_actor { " (liked)" } else { "" };
        println!(
            "  [{}] {who}: {} | {} likes{liked}, {} comments",
            p.post.id, p.post.content, p.like_count, p.comment_count
        );
    }
    println!("== Groups ({})", groups.len());
    for g in &groups {
        let member = if g.is_member { " (member)" } else { "" };
        println!("  [{}] {} | {} members{member}", g.group.id, g.group.name, g.member_count);
    }
    println!("== Upcoming events ({})", events.len());
    for e in &events {
        let going = if e.is_attending { " (attending)" } else { "" };
        println!(
            "  [{}] {} on {} | {} attending{going}",
            e.event.id,
            e.event.title,
            e.event.start_time.format("%Y-%m-%d %H:%M"),
            e.attendee_count
        );
    }
    Ok(())
}
