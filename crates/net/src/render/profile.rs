use maud::{html, Markup};

use lens_service::forms::{FormErrors, NON_FIELD_ERRORS};
use lens_service::parser::post::Post;
use lens_service::parser::profile::{FollowCounts, UserProfile};

use super::{avatar, field_errors, layout, post_card, PageContext};

pub struct ProfileDetail<'a> {
    pub profile: &'a UserProfile,
    pub following: bool,
    pub counts: FollowCounts,
    pub posts: &'a [Post],
}

pub fn detail_page(ctx: &PageContext, detail: &ProfileDetail<'_>) -> Markup {
    let profile = detail.profile;
    let own = ctx.viewer_profile_id() == Some(profile.id);

    let body = html! {
        div class="profile-header" {
            (avatar(profile))
            div {
                h1 { (profile.username) }
                p class="profile-meta" {
                    (detail.posts.len()) " posts · "
                    (detail.counts.followers) " followers · "
                    (detail.counts.following) " following"
                }
                @if let Some(birth_date) = profile.birth_date {
                    p class="profile-meta" { "Born " (birth_date.format("%Y-%m-%d").to_string()) }
                }
            }
        }
        @if !profile.bio.is_empty() {
            p class="post-caption" { (profile.bio) }
        }
        @if own {
            p { a href=(format!("/profile_update/{}", profile.id)) { "Edit profile" } }
        } @else {
            form method="post" action=(format!("/profile_detail/{}", profile.id)) {
                input type="hidden" name="profile_pk" value=(profile.id);
                @if detail.following {
                    button type="submit" { "Unfollow" }
                } @else {
                    button type="submit" { "Follow" }
                }
            }
        }
        @for post in detail.posts {
            (post_card(post))
        }
    };

    layout(ctx, &profile.username, body)
}

pub fn list_page(ctx: &PageContext, profiles: &[UserProfile]) -> Markup {
    let body = html! {
        h1 { "Profiles" }
        @if profiles.is_empty() {
            p { "Nobody else is here yet." }
        }
        ul class="profile-list" {
            @for profile in profiles {
                li {
                    (avatar(profile))
                    a href=(format!("/profile_detail/{}", profile.id)) { (profile.username) }
                }
            }
        }
    };

    layout(ctx, "Profiles", body)
}

pub fn update_page(
    ctx: &PageContext,
    profile: &UserProfile,
    bio: &str,
    birth_date: &str,
    errors: &FormErrors,
) -> Markup {
    let body = html! {
        h1 { "Edit profile" }
        form method="post" action=(format!("/profile_update/{}", profile.id)) enctype="multipart/form-data" {
            (field_errors(errors, NON_FIELD_ERRORS))
            p {
                label for="id_profile_picture" { "Profile picture" }
                @if profile.profile_picture.is_some() {
                    (avatar(profile))
                    label {
                        input type="checkbox" name="profile_picture-clear";
                        " Clear"
                    }
                }
                input type="file" id="id_profile_picture" name="profile_picture" accept="image/*";
                (field_errors(errors, "profile_picture"))
            }
            p {
                label for="id_bio" { "Biography" }
                textarea id="id_bio" name="bio" rows="5" maxlength="500" { (bio) }
                (field_errors(errors, "bio"))
            }
            p {
                label for="id_birth_date" { "Birth date" }
                input type="date" id="id_birth_date" name="birth_date" value=(birth_date);
                (field_errors(errors, "birth_date"))
            }
            button type="submit" { "Save" }
        }
    };

    layout(ctx, "Edit profile", body)
}
