//! Account pages, rendered with Maud.

use crate::auth::Session;
use maud::{DOCTYPE, Markup, html};

fn shell(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " - frflashy" }
            }
            body {
                main { (body) }
            }
        }
    }
}

pub fn login_page(error: Option<&str>) -> Markup {
    shell(
        "Log in",
        html! {
            h1 { "Log in" }
            @if let Some(error) = error {
                p.error role="alert" { (error) }
            }
            form method="post" action="/login" {
                label for="username" { "Username" }
                input #username type="text" name="username" autocomplete="username" required;
                label for="password" { "Password" }
                input #password type="password" name="password" autocomplete="current-password" required;
                button type="submit" { "Log in" }
            }
        },
    )
}

pub fn dashboard_page(session: &Session) -> Markup {
    shell(
        "Dashboard",
        html! {
            h1 { "Bienvenue, " (session.username) }
            p { "Your plan: " strong { (session.tier) } }
            nav {
                a href="/" { "Home" }
                " · "
                a href="/logout" { "Log out" }
            }
        },
    )
}
