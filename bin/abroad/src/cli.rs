use std::path::PathBuf;

use ab_catalog::{InstitutionKind, PriceBand, PropertyKind};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "abroad", version)]
#[command(about = "Community feeds and relocation reference data for people moving abroad")]
#[command(subcommand_required = true, arg_required_else_help = true)]
pub struct Cli {
    /// Account e-mail used to sign in before community commands
    #[arg(long, env = "ABROAD_EMAIL", global = true)]
    pub email: Option<String>,

    /// Account password
    #[arg(long, env = "ABROAD_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show posts, live stories, groups and upcoming events
    Feed,

    /// Publish a post, optionally with an image
    Post {
        text: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Like a post
    Like { post_id: Uuid },

    /// Comment on a post
    Comment { post_id: Uuid, text: String },

    /// Join a group
    Join { group_id: Uuid },

    /// Attend an event
    Attend { event_id: Uuid },

    /// Visa requirements and application steps for a destination
    Visa { country: String },

    /// Embassy contact for a destination
    Embassy { country: String },

    /// Accommodation listings in a city
    Housing {
        city: String,
        #[arg(long, value_enum)]
        kind: Option<HousingKind>,
        #[arg(long, value_enum)]
        price: Option<PriceArg>,
    },

    /// Universities, companies and research institutes
    Institutions {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum)]
        kind: Option<InstitutionArg>,
    },

    /// Starter flashcards and quiz for a destination's language
    Flashcards { country: String },
}

impl Commands {
    /// Commands that only read the bundled reference catalog.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Commands::Visa { .. }
                | Commands::Embassy { .. }
                | Commands::Housing { .. }
                | Commands::Institutions { .. }
                | Commands::Flashcards { .. }
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HousingKind {
    Apartment,
    House,
    Dormitory,
    Shared,
}

impl From<HousingKind> for PropertyKind {
    fn from(kind: HousingKind) -> Self {
        match kind {
            HousingKind::Apartment => PropertyKind::Apartment,
            HousingKind::House => PropertyKind::House,
            HousingKind::Dormitory => PropertyKind::Dormitory,
            HousingKind::Shared => PropertyKind::Shared,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriceArg {
    Low,
    Medium,
    High,
}

impl From<PriceArg> for PriceBand {
    fn from(band: PriceArg) -> Self {
        match band {
            PriceArg::Low => PriceBand::Low,
            PriceArg::Medium => PriceBand::Medium,
            PriceArg::High => PriceBand::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum InstitutionArg {
    University,
    Company,
    Research,
}

impl From<InstitutionArg> for InstitutionKind {
    fn from(kind: InstitutionArg) -> Self {
        match kind {
            InstitutionArg::University => InstitutionKind::University,
            InstitutionArg::Company => InstitutionKind::Company,
            InstitutionArg::Research => InstitutionKind::Research,
        }
    }
}
