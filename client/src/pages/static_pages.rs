//! Placeholder screens for the routes that have no live data yet.

use leptos::prelude::*;

#[component]
pub fn GalleryPage() -> impl IntoView {
    view! {
        <section class="section">
            <div class="container content">
                <h1>"Gallery"</h1>
                <p>"Saved views will show up here."</p>
            </div>
        </section>
    }
}

#[component]
pub fn AboutPage() -> impl IntoView {
    view! {
        <section class="section">
            <div class="container content">
                <h1>"About"</h1>
                <p>"A small Mandelbrot explorer with a shared guestbook."</p>
            </div>
        </section>
    }
}
