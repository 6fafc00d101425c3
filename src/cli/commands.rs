use std::time::Duration;

use crate::app::{AppContext, FreshetError, Result};
use crate::monitor::ContextMonitor;
use crate::poller::{format_interval, parse_interval};

pub async fn show(ctx: &AppContext) -> Result<()> {
    let state = ctx.engine.cold_start()?;

    if state.is_empty() {
        println!("Cache is empty; run `freshet refresh`");
        return Ok(());
    }

    for item in &state.items {
        println!(
            "{} {:>5}  {}  {}",
            item.created_at.format("%Y-%m-%d %H:%M"),
            item.like_count,
            item.author,
            item.caption
        );
    }

    match &state.next_cursor {
        Some(_) => println!("\n{} items cached, more available", state.items.len()),
        None => println!("\n{} items cached, end of feed", state.items.len()),
    }

    Ok(())
}

pub async fn refresh(ctx: &AppContext) -> Result<()> {
    let outcome = ctx.engine.refresh().await?;
    let count = ctx.store.item_count()?;
    println!("Refreshed: {count} items cached");
    if outcome.end_of_pagination {
        println!("End of feed reached");
    }
    Ok(())
}

pub async fn more(ctx: &AppContext) -> Result<()> {
    let before = ctx.store.item_count()?;
    let outcome = ctx.engine.load_more().await?;
    let after = ctx.store.item_count()?;

    if outcome.end_of_pagination && after == before {
        println!("Already at the end of the feed");
    } else {
        println!("Loaded {} items", after - before);
        if outcome.end_of_pagination {
            println!("End of feed reached");
        }
    }
    Ok(())
}

pub async fn previous(ctx: &AppContext) -> Result<()> {
    let before = ctx.store.item_count()?;
    let outcome = ctx.engine.load_previous().await?;
    let after = ctx.store.item_count()?;

    if outcome.end_of_pagination && after == before {
        println!("Nothing earlier to load");
    } else {
        println!("Loaded {} items", after - before);
    }
    Ok(())
}

pub async fn poll(ctx: &AppContext) -> Result<()> {
    ctx.poller.tick().await?;
    let pending = ctx.poller.pending_count();

    if pending == 0 {
        println!("No new content");
    } else {
        println!("{pending} new items pending; run `freshet reveal`");
    }
    Ok(())
}

pub async fn reveal(ctx: &AppContext) -> Result<()> {
    let inserted = ctx.poller.reveal().await?;
    println!("Revealed {inserted} new items");
    Ok(())
}

pub async fn watch(ctx: &AppContext, interval: &str) -> Result<()> {
    let secs = parse_interval(interval).map_err(FreshetError::Config)?;
    if secs == 0 {
        return Err(FreshetError::Config("Interval must be positive".into()));
    }

    let handle = ctx.poller.clone().spawn(Duration::from_secs(secs));
    let mut has_new = ctx.poller.has_new_content();

    println!(
        "Watching for new content every {} (Ctrl+C to stop)",
        format_interval(secs)
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = has_new.changed() => {
                if changed.is_err() {
                    break;
                }
                if *has_new.borrow() {
                    println!(
                        "{} new items pending; run `freshet reveal`",
                        ctx.poller.pending_count()
                    );
                }
            }
        }
    }

    handle.stop();
    println!("Stopped");
    Ok(())
}

pub async fn status(ctx: &AppContext) -> Result<()> {
    let state = ctx.engine.cold_start()?;

    println!("Cached items:  {}", state.items.len());
    println!("Pending items: {}", ctx.poller.pending_count());
    println!(
        "Trailing page: {}",
        if state.next_cursor.is_some() {
            "available"
        } else {
            "exhausted"
        }
    );
    println!("Network:       {:?}", ctx.monitor.network_class());
    println!("Power:         {:?}", ctx.monitor.power_class());
    println!(
        "Prefetch:      {}",
        if ctx.monitor.prefetch_allowed() {
            "allowed"
        } else {
            "disabled"
        }
    );

    Ok(())
}

pub async fn clear(ctx: &AppContext) -> Result<()> {
    ctx.engine.invalidate().await?;
    println!("Cache cleared");
    Ok(())
}
