//! Top navigation bar with a collapsible mobile menu.
//!
//! SYSTEM CONTEXT
//! ==============
//! The navbar is handed a `RouteSource` instead of reading the router. It
//! highlights the entry whose component matches the last route signal and
//! owns the burger toggle for small screens.

use std::rc::Rc;

use leptos::prelude::*;

use crate::state::nav::{MENU, NavController, NavState, SOURCE_URL};
use crate::state::route::RouteSource;

#[component]
pub fn NavBar(routes: StoredValue<Rc<dyn RouteSource>, LocalStorage>) -> impl IntoView {
    let controller = routes.with_value(|source| NavController::new(source.as_ref()));
    let nav = RwSignal::new(controller.state().get());
    let mirror = controller.state().observe(move |s: &NavState| nav.set(s.clone()));
    // Owned by the component; dropping it detaches from the route source.
    let controller = StoredValue::new_local((controller, mirror));

    let on_burger = move |_| controller.with_value(|(c, _)| c.toggle_burger());

    view! {
        <nav class="navbar is-light" role="navigation" aria-label="main navigation">
            <div class="navbar-brand">
                <a href="/" class="navbar-item">
                    <h1 class="title is-4">"mandelbrot"</h1>
                </a>
                <a
                    role="button"
                    class=move || nav.with(NavState::burger_class)
                    aria-label="menu"
                    aria-expanded=move || nav.with(NavState::aria_expanded)
                    on:click=on_burger
                >
                    <span aria-hidden="true"></span>
                    <span aria-hidden="true"></span>
                    <span aria-hidden="true"></span>
                </a>
            </div>
            <div class=move || nav.with(NavState::menu_class)>
                <div class="navbar-start">
                    {MENU
                        .iter()
                        .map(|entry| {
                            let component = entry.component;
                            view! {
                                <a href=entry.href class=move || nav.with(|s| s.item_class(component))>
                                    <span class=format!("icon {}", entry.tone)>
                                        <i class=entry.icon></i>
                                    </span>
                                    <span>{entry.label}</span>
                                </a>
                            }
                        })
                        .collect_view()}
                </div>
                <div class="navbar-end">
                    <div class="navbar-item">
                        <div class="buttons">
                            <a class="button" href=SOURCE_URL target="_blank" rel="noopener">
                                <span class="icon">
                                    <i class="fab fa-lg fa-github-alt"></i>
                                </span>
                                <span>"Source"</span>
                            </a>
                        </div>
                    </div>
                </div>
            </div>
        </nav>
    }
}
