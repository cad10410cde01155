// src/pipeline/render.rs

//! HTML index pages.

use maud::{DOCTYPE, Markup, html};

use crate::models::{ArchiveEntry, SiteConfig, group_by_year};

use super::navigation::{ChannelNode, GroupNode, ServerNode, SiteNode, ThreadNode, latest_formats};

const STYLESHEET: &str = "\
body{font-family:system-ui,sans-serif;max-width:60rem;margin:0 auto;padding:1rem 2rem;color:#222}\
nav.breadcrumbs{font-size:.9rem;margin-bottom:1rem}\
table{border-collapse:collapse;width:100%}\
th,td{text-align:left;padding:.35rem .6rem;border-bottom:1px solid #ddd}\
.muted{color:#777}\
.badge{font-size:.75rem;background:#eee;border-radius:.3rem;padding:0 .35rem}\
footer{margin-top:2rem;font-size:.8rem;color:#777}";

/// Common page frame. `crumbs` are `(href, label)` pairs from the site root.
fn layout(site: &SiteConfig, title: &str, crumbs: &[(String, String)], body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · " (site.title) }
                style { (STYLESHEET) }
            }
            body {
                @if !crumbs.is_empty() {
                    nav.breadcrumbs {
                        @for (i, (href, label)) in crumbs.iter().enumerate() {
                            @if i > 0 { " / " }
                            a href=(href) { (label) }
                        }
                    }
                }
                h1 { (title) }
                (body)
                footer { (site.title) }
            }
        }
    }
}

/// Year-grouped archive table of one unit.
fn archive_list(archives: &[ArchiveEntry]) -> Markup {
    html! {
        @let latest = latest_formats(archives);
        @if !latest.is_empty() {
            p {
                "Latest: "
                @for format in latest {
                    a href={ "latest." (format.extension()) } { (format.extension().to_uppercase()) }
                    " "
                }
            }
        }
        @if archives.is_empty() {
            p.muted { "No archives yet" }
        }
        @for year in group_by_year(archives) {
            h2 { (year.year) }
            table {
                thead { tr { th { "Period" } th { "Messages" } th { "Formats" } } }
                tbody {
                    @for archive in &year.archives {
                        tr {
                            td { (archive.date) }
                            td { (archive.message_count) }
                            td {
                                @for format in &archive.formats {
                                    a href=(archive.href(*format)) { (format.extension().to_uppercase()) }
                                    " "
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn site_page(site: &SiteConfig, node: &SiteNode, generated_at: &str) -> Markup {
    let body = html! {
        @if !site.description.is_empty() {
            p { (site.description) }
        }
        @if node.servers.is_empty() {
            p.muted { "Nothing archived yet" }
        } @else {
            table {
                thead { tr { th { "Server" } th { "Channels" } th { "Forums" } th { "Last updated" } } }
                tbody {
                    @for server in &node.servers {
                        tr {
                            td { a href={ (server.key) "/" } { (server.display_name) } }
                            td { (server.channels.len()) }
                            td { (server.groups.len()) }
                            td { (server.last_updated().unwrap_or("-")) }
                        }
                    }
                }
            }
        }
        p.muted { "Generated " (generated_at) }
    };
    layout(site, &site.title, &[], body)
}

pub fn server_page(site: &SiteConfig, server: &ServerNode) -> Markup {
    let crumbs = [("../".to_string(), site.title.clone())];
    let body = html! {
        @if !server.channels.is_empty() {
            h2 { "Channels" }
            table {
                thead { tr { th { "Channel" } th { "Archives" } th { "Messages (latest)" } th { "Last updated" } } }
                tbody {
                    @for channel in &server.channels {
                        tr {
                            td { a href={ (channel.name) "/" } { "#" (channel.name) } }
                            td { (channel.archives.len()) }
                            td { (channel.message_count()) }
                            td { (channel.last_updated().unwrap_or("-")) }
                        }
                    }
                }
            }
        }
        @if !server.groups.is_empty() {
            h2 { "Forums" }
            table {
                thead { tr { th { "Forum" } th { "Threads" } th { "Last updated" } } }
                tbody {
                    @for group in &server.groups {
                        tr {
                            td { a href={ (group.name) "/" } { (group.name) } }
                            td { (group.threads.len()) }
                            td { (group.last_updated().unwrap_or("-")) }
                        }
                    }
                }
            }
        }
        @if server.channels.is_empty() && server.groups.is_empty() {
            p.muted { "No channels archived yet" }
        }
    };
    layout(site, &server.display_name, &crumbs, body)
}

pub fn channel_page(site: &SiteConfig, server: &ServerNode, channel: &ChannelNode) -> Markup {
    let crumbs = [
        ("../../".to_string(), site.title.clone()),
        ("../".to_string(), server.display_name.clone()),
    ];
    layout(
        site,
        &format!("#{}", channel.name),
        &crumbs,
        archive_list(&channel.archives),
    )
}

pub fn group_page(site: &SiteConfig, server: &ServerNode, group: &GroupNode) -> Markup {
    let crumbs = [
        ("../../".to_string(), site.title.clone()),
        ("../".to_string(), server.display_name.clone()),
    ];
    let body = html! {
        @if group.threads.is_empty() {
            p.muted { "No threads archived yet" }
        } @else {
            table {
                thead { tr { th { "Thread" } th { "Replies" } th { "Last activity" } } }
                tbody {
                    @for thread in &group.threads {
                        tr {
                            td {
                                a href={ (thread.slug) "/" } { (thread.title) }
                                @if thread.archived {
                                    " " span.badge { "archived" }
                                }
                            }
                            td { (thread.reply_count) }
                            td { (thread.last_activity) }
                        }
                    }
                }
            }
        }
    };
    layout(site, &group.name, &crumbs, body)
}

pub fn thread_page(
    site: &SiteConfig,
    server: &ServerNode,
    group: &GroupNode,
    thread: &ThreadNode,
) -> Markup {
    let crumbs = [
        ("../../../".to_string(), site.title.clone()),
        ("../../".to_string(), server.display_name.clone()),
        ("../".to_string(), group.name.clone()),
    ];
    layout(site, &thread.title, &crumbs, archive_list(&thread.archives))
}
