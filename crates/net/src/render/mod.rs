pub mod auth;
pub mod feed;
pub mod pages;
pub mod profile;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use tower_cookies::Cookies;

use lens_service::forms::FormErrors;
use lens_service::parser::post::Post;
use lens_service::parser::profile::UserProfile;

use crate::flash::{take_flash, FlashMessage};
use crate::session::Viewer;
use crate::state::AppState;

pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
:root{--bg:#fafafa;--fg:#111;--fg2:#555;--fg3:#999;--accent:#c13584;--border:#e5e5e5}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.6;color:var(--fg);background:var(--bg);min-height:100vh;display:flex;flex-direction:column;align-items:center}
nav{width:100%;display:flex;gap:1rem;align-items:center;padding:.75rem 1.5rem;border-bottom:1px solid var(--border);background:#fff}
nav .brand{font-weight:800;font-size:1.3rem;margin-right:auto;color:var(--fg)}
main{max-width:640px;width:100%;flex:1;padding:1.5rem 1rem}
a{color:var(--accent);text-decoration:none}
a:hover{text-decoration:underline}
img{max-width:100%;height:auto}
h1{font-size:1.5rem;margin-bottom:1rem}
.flash{padding:.6rem .9rem;border-radius:6px;margin-bottom:.75rem}
.flash-success{background:#e8f7ee;color:#17633a}
.flash-info{background:#e8f0fb;color:#1d4f91}
.flash-error{background:#fdecec;color:#8f1d1d}
.card{background:#fff;border:1px solid var(--border);border-radius:10px;padding:1rem;margin-bottom:1rem}
.post-author{font-weight:600}
.post-time{color:var(--fg3);font-size:.8rem}
.post-caption{white-space:pre-wrap;word-break:break-word;margin-top:.5rem}
.avatar{width:72px;height:72px;border-radius:50%;object-fit:cover;background:var(--accent);display:inline-flex;align-items:center;justify-content:center;color:#fff;font-weight:700;font-size:1.6rem;text-transform:uppercase}
.profile-header{display:flex;gap:1rem;align-items:center;margin-bottom:1rem}
.profile-meta{color:var(--fg2);font-size:.9rem}
.profile-list{list-style:none}
.profile-list li{display:flex;gap:.75rem;align-items:center;padding:.5rem 0;border-bottom:1px solid var(--border)}
.profile-list .avatar{width:40px;height:40px;font-size:1rem}
form p{margin-bottom:.75rem}
label{display:block;font-weight:600;font-size:.9rem}
input[type=text],input[type=password],input[type=date],textarea{width:100%;padding:.45rem;border:1px solid var(--border);border-radius:6px;font:inherit}
button{padding:.45rem 1.1rem;border:none;border-radius:6px;background:var(--accent);color:#fff;font-weight:600;cursor:pointer}
.errorlist{list-style:none;color:#8f1d1d;font-size:.85rem}
footer{padding:1rem;color:var(--fg3);font-size:.85rem;display:flex;gap:1rem}
"#;

/// Per-request data every page needs.
pub struct PageContext {
    pub site_name: String,
    pub viewer: Option<Viewer>,
    pub messages: Vec<FlashMessage>,
}

impl PageContext {
    /// Consumes the pending flash messages.
    pub fn new<T>(state: &AppState<T>, cookies: &Cookies, viewer: Option<Viewer>) -> Self {
        Self {
            site_name: state.config.site_name.clone(),
            viewer,
            messages: take_flash(cookies),
        }
    }

    pub fn viewer_profile_id(&self) -> Option<u64> {
        self.viewer.as_ref().map(|v| v.profile.id)
    }
}

pub fn layout(ctx: &PageContext, title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · " (ctx.site_name) }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                nav {
                    a class="brand" href="/" { (ctx.site_name) }
                    @if let Some(viewer) = &ctx.viewer {
                        a href="/profile_list" { "Profiles" }
                        a href="/post_create" { "New post" }
                        a href=(format!("/profile_detail/{}", viewer.profile.id)) { (viewer.user.username) }
                        a href="/logout" { "Log out" }
                    } @else {
                        a href="/login" { "Log in" }
                        a href="/register" { "Register" }
                    }
                }
                main {
                    @for message in &ctx.messages {
                        div class=(message.level.css_class()) { (message.message) }
                    }
                    (body)
                }
                footer {
                    a href="/legal" { "Legal" }
                    a href="/contact" { "Contact" }
                }
            }
        }
    }
}

/// Standalone page for errors, rendered without a session lookup.
pub fn error_page(title: &str, message: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="robots" content="noindex";
                title { (title) }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                main class="error-page" {
                    h1 { (title) }
                    p { (message) }
                    a href="/" { "Back to the home page" }
                }
            }
        }
    }
}

pub fn field_errors(errors: &FormErrors, field: &str) -> Markup {
    html! {
        @if let Some(messages) = errors.get(field) {
            ul class="errorlist" {
                @for message in messages {
                    li { (message) }
                }
            }
        }
    }
}

pub fn avatar(profile: &UserProfile) -> Markup {
    let initial = profile
        .username
        .chars()
        .next()
        .unwrap_or('?')
        .to_uppercase()
        .to_string();

    html! {
        @if profile.profile_picture.is_some() {
            img class="avatar" src=(format!("/profile_picture/{}", profile.id)) alt=(profile.username);
        } @else {
            span class="avatar" { (initial) }
        }
    }
}

pub fn post_card(post: &Post) -> Markup {
    html! {
        article class="card post" {
            a class="post-author" href=(format!("/profile_detail/{}", post.profile_id)) { (post.username) }
            " "
            span class="post-time" { (post.created_at.format("%Y-%m-%d %H:%M").to_string()) }
            @if post.image.is_some() {
                img src=(format!("/post_image/{}", post.id)) alt=(post.caption) loading="lazy";
            }
            p class="post-caption" { (post.caption) }
        }
    }
}
