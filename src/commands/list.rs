//! `roam list`: print stored repositories as a table

use clap::Args;

use super::Context;
use crate::error::Result;
use crate::resolve::ManyFilter;
use crate::store::{DAY, HOUR, RepoQuery, Repository, now};
use crate::workspace;

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Remote name or keyword
    pub head: Option<String>,

    /// `owner/`, `owner/name` or keyword within the remote
    pub query: Option<String>,

    /// Show disk usage (walks every repository)
    #[arg(short, long)]
    pub size: bool,
}

pub fn run(ctx: &Context, args: &ListArgs) -> Result<()> {
    let head = args.head.as_deref().unwrap_or_default();
    let query = args.query.as_deref().unwrap_or_default();
    let repos = ctx
        .resolver()
        .resolve_many(head, query, ManyFilter::default())?;

    let sizes: Option<Vec<u64>> = args.size.then(|| {
        repos
            .iter()
            .map(|repo| workspace::dir_size(&ctx.path(repo)))
            .collect()
    });

    print!("{}", render_table(&repos, sizes.as_deref(), now()));
    let total = ctx.store.count(&RepoQuery::new());
    eprintln!("{}", summary(repos.len(), total));
    Ok(())
}

fn summary(shown: usize, total: usize) -> String {
    if shown == total {
        format!("{} repositories", total)
    } else {
        format!("{} of {} repositories", shown, total)
    }
}

fn render_table(repos: &[Repository], sizes: Option<&[u64]>, now: u64) -> String {
    let mut header = vec!["ID", "FLAGS", "LANG", "VISITS", "LAST VISIT", "SCORE"];
    if sizes.is_some() {
        header.push("SIZE");
    }
    let mut rows = vec![header.iter().map(|s| s.to_string()).collect::<Vec<_>>()];

    for (i, repo) in repos.iter().enumerate() {
        let mut row = vec![
            repo.id(),
            flags(repo),
            repo.language.clone().unwrap_or_else(|| "-".to_string()),
            repo.visit_count.to_string(),
            format_ago(now, repo.visit_time),
            repo.score.to_string(),
        ];
        if let Some(sizes) = sizes {
            row.push(format_size(sizes.get(i).copied().unwrap_or_default()));
        }
        rows.push(row);
    }

    let mut widths = vec![0; rows[0].len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn flags(repo: &Repository) -> String {
    let mut flags = String::new();
    if repo.pin {
        flags.push('P');
    }
    if repo.sync {
        flags.push('S');
    }
    if flags.is_empty() {
        flags.push('-');
    }
    flags
}

/// "5m ago" style age of a unix timestamp
fn format_ago(now: u64, time: u64) -> String {
    if time == 0 {
        return "never".to_string();
    }
    let delta = now.saturating_sub(time);
    if delta < 60 {
        format!("{}s ago", delta)
    } else if delta < HOUR {
        format!("{}m ago", delta / 60)
    } else if delta < DAY {
        format!("{}h ago", delta / HOUR)
    } else {
        format!("{}d ago", delta / DAY)
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
