//! `roam branch` and `roam tag`: what the current repository has locally

use crossterm::style::{Color, Stylize};

use super::Context;
use crate::error::Result;
use crate::git::{Branch, BranchStatus, GitCommand, Tag};
use crate::term::Verbosity;

pub fn branches(ctx: &Context) -> Result<()> {
    let repo = ctx.current()?;
    let git = GitCommand::in_dir(&ctx.path(&repo), Verbosity::Quiet);
    for branch in Branch::list(&git)? {
        println!("{}", render_branch(&branch));
    }
    Ok(())
}

pub fn tags(ctx: &Context) -> Result<()> {
    let repo = ctx.current()?;
    let git = GitCommand::in_dir(&ctx.path(&repo), Verbosity::Quiet);
    for tag in Tag::list(&git)? {
        println!("{} {} {}", tag.name.as_str().bold(), tag.commit.as_str().dark_grey(), tag.message);
    }
    Ok(())
}

fn status_color(status: BranchStatus) -> Color {
    match status {
        BranchStatus::Sync => Color::Green,
        BranchStatus::Ahead | BranchStatus::Behind => Color::Cyan,
        BranchStatus::Conflict | BranchStatus::Gone => Color::Red,
        BranchStatus::Detached => Color::Yellow,
    }
}

fn render_branch(branch: &Branch) -> String {
    let marker = if branch.current { "*" } else { " " };
    format!(
        "{} {} {} {} {}",
        marker,
        branch.name.as_str().bold(),
        branch.status.as_str().with(status_color(branch.status)),
        branch.commit.as_str().dark_grey(),
        branch.message
    )
}
