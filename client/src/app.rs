//! Root application component with routing and the shared collaborators.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::{MetaTags, Stylesheet, Title, provide_meta_context};
use leptos_router::{
    StaticSegment,
    components::{Route, Router, Routes},
    hooks::use_location,
};

use crate::components::navbar::NavBar;
use crate::net::store::MessageStore;
use crate::pages::{
    explore::ExplorePage,
    guestbook::GuestbookPage,
    static_pages::{AboutPage, GalleryPage},
};
use crate::state::route::{RouteHub, RouteSignal, RouteSource};

/// HTML shell rendered on the server for SSR + hydration.
pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <AutoReload options=options.clone()/>
                <HydrationScripts options/>
                <MetaTags/>
            </head>
            <body>
                <App/>
            </body>
        </html>
    }
}

/// Root application component.
///
/// Builds the route hub and the message store once and hands them to the
/// components that need them.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let hub = RouteHub::new();
    let routes: Rc<dyn RouteSource> = Rc::new(hub.clone());
    let hub = StoredValue::new_local(hub);
    let routes = StoredValue::new_local(routes);
    let store = StoredValue::new_local(message_store());

    view! {
        <Stylesheet id="leptos" href="/pkg/mandelbrot.css"/>
        <Title text="mandelbrot"/>

        <Router>
            <RouteFeed hub/>
            <NavBar routes/>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=StaticSegment("") view=ExplorePage/>
                    <Route path=StaticSegment("explore") view=ExplorePage/>
                    <Route path=StaticSegment("gallery") view=GalleryPage/>
                    <Route path=StaticSegment("about") view=AboutPage/>
                    <Route path=StaticSegment("guestbook") view=move || view! { <GuestbookPage store/> }/>
                </Routes>
            </main>
        </Router>
    }
}

/// Publishes the router's location into the route hub.
#[component]
fn RouteFeed(hub: StoredValue<RouteHub, LocalStorage>) -> impl IntoView {
    let location = use_location();

    // Publish before the navbar is built so the first render is already correct.
    let path = location.pathname.get_untracked();
    hub.with_value(|h| h.publish(RouteSignal::for_path(&path)));

    Effect::new(move || {
        let path = location.pathname.get();
        hub.with_value(|h| h.publish(RouteSignal::for_path(&path)));
    });
}

#[cfg(feature = "hydrate")]
fn message_store() -> Rc<dyn MessageStore> {
    Rc::new(crate::net::ws_store::WsStore::connect())
}

#[cfg(not(feature = "hydrate"))]
fn message_store() -> Rc<dyn MessageStore> {
    Rc::new(crate::net::store::OfflineStore)
}
