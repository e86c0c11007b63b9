use maud::{html, Markup};

use lens_service::forms::{FormErrors, NON_FIELD_ERRORS};
use lens_service::parser::post::Post;

use super::{field_errors, layout, post_card, PageContext};

pub fn home_page(ctx: &PageContext, posts: &[Post]) -> Markup {
    let body = html! {
        @if ctx.viewer.is_some() {
            h1 { "Your feed" }
            @if posts.is_empty() {
                p { "Nothing yet. " a href="/profile_list" { "Find people to follow" } "." }
            }
        } @else {
            h1 { "Latest posts" }
        }
        @for post in posts {
            (post_card(post))
        }
    };

    layout(ctx, "Home", body)
}

pub fn post_create_page(ctx: &PageContext, caption: &str, errors: &FormErrors) -> Markup {
    let body = html! {
        h1 { "New post" }
        form method="post" action="/post_create" enctype="multipart/form-data" {
            (field_errors(errors, NON_FIELD_ERRORS))
            p {
                label for="id_image" { "Image" }
                input type="file" id="id_image" name="image" accept="image/*";
                (field_errors(errors, "image"))
            }
            p {
                label for="id_caption" { "Caption" }
                textarea id="id_caption" name="caption" rows="4" maxlength="2200" { (caption) }
                (field_errors(errors, "caption"))
            }
            button type="submit" { "Publish" }
        }
    };

    layout(ctx, "New post", body)
}
