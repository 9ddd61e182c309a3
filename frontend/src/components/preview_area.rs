use super::super::{Model, Msg};
use super::utils::debounce;
use yew::prelude::*;

pub fn render_preview_area(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(file_data) = &model.file else {
        return html! {};
    };

    let link = ctx.link().clone();
    let file_name = file_data.file.name();

    html! {
        <div id="preview-container">
            <img id="actual-image-preview"
                src={file_data.preview_url.to_string()}
                alt={file_name.clone()}
                title={file_name} />
            {
                if model.loading {
                    html! {
                        <div class="loading-indicator">
                            <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                            <p>{"Analyzing scan..."}</p>
                        </div>
                    }
                } else {
                    html! {}
                }
            }
            <div class="button-container">
                <button
                    id="clear-btn"
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    disabled={model.loading}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::ClearFile)
                    })}
                >
                    <i class="fa-solid fa-trash"></i>{" Clear"}
                </button>
            </div>
        </div>
    }
}
