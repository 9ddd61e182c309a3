use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-brain"></i> {" Brain Tumor MRI Analysis"}</h1>
            <p class="subtitle">{"Pick an MRI scan via button, drag & drop, or paste"}</p>
        </header>
    }
}
