use maud::{html, Markup};

use super::{layout, PageContext};

pub fn legal_page(ctx: &PageContext) -> Markup {
    let body = html! {
        h1 { "Legal notice" }
        p {
            (ctx.site_name) " is a small photo sharing site. Accounts, profiles, posts and "
            "follow relations are stored only to operate the service and are never shared."
        }
        p {
            "You keep the rights to everything you publish. By posting you allow "
            (ctx.site_name) " to display it to other members."
        }
        p { "Sessions use a single strictly necessary cookie." }
    };

    layout(ctx, "Legal", body)
}

pub fn contact_page(ctx: &PageContext) -> Markup {
    let body = html! {
        h1 { "Contact" }
        p { "Questions, bug reports or takedown requests are welcome." }
        p { "Write to " a href="mailto:hello@example.com" { "hello@example.com" } "." }
    };

    layout(ctx, "Contact", body)
}
