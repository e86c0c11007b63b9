use maud::{html, Markup};

use lens_service::forms::FormErrors;

use super::{field_errors, layout, PageContext};

pub fn login_page(ctx: &PageContext, username: &str, errors: &FormErrors) -> Markup {
    let body = html! {
        h1 { "Log in" }
        form method="post" action="/login" {
            p {
                label for="id_username" { "Username" }
                input type="text" id="id_username" name="username" value=(username) maxlength="150" autofocus;
                (field_errors(errors, "username"))
            }
            p {
                label for="id_password" { "Password" }
                input type="password" id="id_password" name="password";
                (field_errors(errors, "password"))
            }
            button type="submit" { "Log in" }
        }
        p { "No account yet? " a href="/register" { "Register" } }
    };

    layout(ctx, "Log in", body)
}

pub fn register_page(ctx: &PageContext, username: &str, errors: &FormErrors) -> Markup {
    let body = html! {
        h1 { "Create an account" }
        form method="post" action="/register" {
            p {
                label for="id_username" { "Username" }
                input type="text" id="id_username" name="username" value=(username) maxlength="150" autofocus;
                (field_errors(errors, "username"))
            }
            p {
                label for="id_password1" { "Password" }
                input type="password" id="id_password1" name="password1";
                (field_errors(errors, "password1"))
            }
            p {
                label for="id_password2" { "Password confirmation" }
                input type="password" id="id_password2" name="password2";
                (field_errors(errors, "password2"))
            }
            button type="submit" { "Register" }
        }
    };

    layout(ctx, "Register", body)
}
