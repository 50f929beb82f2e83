//! Explore page: the Mandelbrot set drawn onto a canvas.
//!
//! The image is computed once in the browser after hydration. Server
//! rendering emits only the empty canvas.

use leptos::prelude::*;

use crate::util::mandelbrot::{RENDER_HEIGHT, RENDER_WIDTH};

#[component]
pub fn ExplorePage() -> impl IntoView {
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    #[cfg(feature = "hydrate")]
    Effect::new(move || {
        let Some(canvas) = canvas_ref.get() else {
            return;
        };
        draw(&canvas);
    });

    view! {
        <section class="section">
            <div class="container content">
                <h1>"Explore"</h1>
                <canvas
                    class="explore__canvas"
                    node_ref=canvas_ref
                    width=RENDER_WIDTH.to_string()
                    height=RENDER_HEIGHT.to_string()
                    style="width: 100%; height: auto;"
                    aria-label="The Mandelbrot set"
                ></canvas>
            </div>
        </section>
    }
}

#[cfg(feature = "hydrate")]
fn draw(canvas: &web_sys::HtmlCanvasElement) {
    use wasm_bindgen::{Clamped, JsCast};

    use crate::util::mandelbrot::{Viewport, render};

    let Ok(Some(context)) = canvas.get_context("2d") else {
        return;
    };
    let Ok(context) = context.dyn_into::<web_sys::CanvasRenderingContext2d>() else {
        return;
    };

    let pixels = render(&Viewport::FULL, RENDER_WIDTH, RENDER_HEIGHT);
    let image = match web_sys::ImageData::new_with_u8_clamped_array_and_sh(Clamped(&pixels), RENDER_WIDTH, RENDER_HEIGHT)
    {
        Ok(image) => image,
        Err(err) => {
            leptos::logging::warn!("explore: image data rejected: {err:?}");
            return;
        }
    };
    if let Err(err) = context.put_image_data(&image, 0.0, 0.0) {
        leptos::logging::warn!("explore: draw failed: {err:?}");
    }
}
