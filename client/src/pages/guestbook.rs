//! Guestbook page: a post form and the live list of recent messages.
//!
//! SYSTEM CONTEXT
//! ==============
//! The page owns a `GuestbookController` for as long as it is mounted. The
//! live query opens when the page mounts in the browser and closes on
//! unmount; change batches flow into the controller's state cell, which is
//! mirrored into a signal for rendering.

use std::rc::Rc;

use leptos::prelude::*;

use frames::feed::{MAX_NAME_CHARS, MAX_TEXT_CHARS};

use crate::net::store::MessageStore;
use crate::state::guestbook::{FeedView, GuestbookState};
use crate::state::guestbook_controller::GuestbookController;
use crate::util::time::now_ms;

#[component]
pub fn GuestbookPage(store: StoredValue<Rc<dyn MessageStore>, LocalStorage>) -> impl IntoView {
    let controller = GuestbookController::new(store.get_value());
    let state = RwSignal::new(controller.state().get());
    let mirror = controller.state().observe(move |s: &GuestbookState| state.set(s.clone()));
    let controller = StoredValue::new_local((controller, mirror));

    Effect::new(move || controller.with_value(|(c, _)| c.attach()));
    on_cleanup(move || {
        controller.try_with_value(|(c, _)| c.detach());
    });

    let on_name = move |ev: leptos::ev::Event| controller.with_value(|(c, _)| c.set_name(event_target_value(&ev)));
    let on_text = move |ev: leptos::ev::Event| controller.with_value(|(c, _)| c.set_text(event_target_value(&ev)));
    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if let Some(pending) = controller.with_value(|(c, _)| c.submit(now_ms())) {
            leptos::task::spawn_local(pending);
        }
    };

    view! {
        <section class="section">
            <div class="container">
                <div class="content">
                    <h1>"Guestbook"</h1>
                    <p>"Type a short message for the whole world to see."</p>
                </div>
                <div class="columns">
                    <div class="column is-two-thirds-tablet is-half-desktop">
                        <form on:submit=on_submit>
                            <div class="field is-horizontal">
                                <div class="field-label is-normal">
                                    <label class="label" for="name">"Name"</label>
                                </div>
                                <div class="field-body">
                                    <div class="field">
                                        <p class="control">
                                            <input
                                                id="name"
                                                class="input"
                                                type="text"
                                                placeholder="Enter your name"
                                                maxlength=MAX_NAME_CHARS.to_string()
                                                prop:value=move || state.with(|s| s.draft.name.clone())
                                                on:input=on_name
                                            />
                                        </p>
                                    </div>
                                </div>
                            </div>
                            <div class="field is-horizontal">
                                <div class="field-label is-normal">
                                    <label class="label" for="message">"Message"</label>
                                </div>
                                <div class="field-body">
                                    <div class="field">
                                        <p class="control">
                                            <textarea
                                                id="message"
                                                class="textarea"
                                                placeholder="Enter your message"
                                                maxlength=MAX_TEXT_CHARS.to_string()
                                                prop:value=move || state.with(|s| s.draft.text.clone())
                                                on:input=on_text
                                            ></textarea>
                                        </p>
                                    </div>
                                </div>
                            </div>
                            {move || {
                                state
                                    .with(|s| s.last_error.clone())
                                    .map(|reason| view! { <p class="help is-danger">{reason}</p> })
                            }}
                            <div class="field is-grouped is-grouped-right">
                                <div class="control">
                                    <button
                                        class=move || {
                                            if state.with(GuestbookState::posting) {
                                                "button is-info is-loading"
                                            } else {
                                                "button is-info"
                                            }
                                        }
                                        type="submit"
                                        disabled=move || !state.with(GuestbookState::can_submit)
                                    >
                                        "Post message"
                                    </button>
                                </div>
                            </div>
                        </form>
                    </div>
                </div>
                <hr/>
                <div class="content">
                    <h2>"Visitor messages"</h2>
                    {move || render_feed(state.with(GuestbookState::feed_view))}
                </div>
            </div>
        </section>
    }
}

fn render_feed(feed: FeedView) -> AnyView {
    match feed {
        FeedView::Loading => view! { <p>"Loading..."</p> }.into_any(),
        FeedView::Empty => view! { <p>"No messages yet."</p> }.into_any(),
        FeedView::Messages(rows) => view! {
            <ul>
                {rows
                    .into_iter()
                    .map(|row| {
                        view! {
                            <li>
                                <em>{row.when}</em>
                                " - "
                                <strong>{row.author}</strong>
                                " - "
                                <span>{row.text}</span>
                            </li>
                        }
                    })
                    .collect_view()}
            </ul>
        }
        .into_any(),
    }
}
