//! Catalog-backed commands. These never touch the backend.

use ab_catalog::{InstitutionFilter, PropertyFilter, ReferenceCatalog};
use anyhow::{bail, Result};

use crate::cli::Commands;

pub fn run(catalog: &dyn ReferenceCatalog, command: Commands) -> Result<()> {
    match command {
        Commands::Visa { country } => visa(catalog, &country),
        Commands::Embassy { country } => embassy(catalog, &country),
        Commands::Housing { city, kind, price } => {
            let filter = PropertyFilter {
                kind: kind.map(Into::into),
                price: price.map(Into::into),
            };
            let listings = catalog.properties(&city, &filter);
            if listings.is_empty() {
                println!("No listings found in {city}.");
            }
            for p in listings {
                println!(
                    "{} | {:?} | {}{}/month | {} bd / {} ba | from {}",
                    p.title, p.kind, p.currency, p.price, p.bedrooms, p.bathrooms, p.available
                );
                println!("    {} ({})", p.location, p.amenities.join(", "));
            }
            Ok(())
        }
        Commands::Institutions { search, kind } => {
            let filter = InstitutionFilter {
                search,
                kind: kind.map(Into::into),
            };
            for i in catalog.institutions(&filter) {
                println!("{} [{:?}] {} ({})", i.name, i.kind, i.location, i.website);
            }
            Ok(())
        }
        Commands::Flashcards { country } => {
            let deck = catalog.language_for_country(&country);
            println!("{} ({})", deck.name, deck.code);
            for card in &deck.flashcards {
                println!("  {} = {}", card.front, card.back);
            }
            for (n, q) in deck.quiz.iter().enumerate() {
                println!("Q{}: {} [{}]", n + 1, q.question, q.options.join(" / "));
            }
            Ok(())
        }
        _ => bail!("not a reference command"),
    }
}

fn visa(catalog: &dyn ReferenceCatalog, country: &str) -> Result<()> {
    let Some(info) = catalog.visa(country) else {
        bail!(
            "no visa data for '{country}' (known: {})",
            catalog.countries().join(", ")
        );
    };
    println!("{}: processing {}, fee {}", info.country, info.processing_time, info.fee);
    for req in &info.requirements {
        let mark = if req.required { "required" } else { "optional" };
        println!("  [{mark}] {}: {}", req.name, req.description);
    }
    for (n, step) in info.steps.iter().enumerate() {
        println!("  {}. {step}", n + 1);
    }
    Ok(())
}

fn embassy(catalog: &dyn ReferenceCatalog, country: &str) -> Result<()> {
    let Some(contact) = catalog.embassy(country) else {
        bail!("no embassy contact for '{country}'");
    };
    println!("{}", contact.address);
    println!("phone {} | emergency {}", contact.phone, contact.emergency_contact);
    println!("{} | {}", contact.email, contact.website);
    println!("{}", contact.working_hours);
    Ok(())
}
