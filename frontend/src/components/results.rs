use super::super::Model;
use super::utils::format_confidence;
use shared::ClassLabel;
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    let Some(result) = &model.result else {
        return html! {};
    };

    let tumor_found = result.prediction != ClassLabel::NoTumor;
    let percentage = result.confidence * 100.0;
    let analyzed_filename = model
        .file
        .as_ref()
        .map_or_else(|| "Analyzed Image".to_string(), |fd| fd.file.name());

    html! {
        <div class={classes!("results-container", if tumor_found { "tumor-detected" } else { "no-tumor" })}>
            <div class="result-header">
                <h2 title={format!("Analysis results for: {}", analyzed_filename)}>
                    { format!("Prediction: {}", result.prediction) }
                    <span class="analyzed-filename-display">{format!(" ({})", analyzed_filename)}</span>
                </h2>
                <div class="confidence-meter">
                    <div class="meter-label">{"Confidence:"}</div>
                    <div class="meter">
                        <div class="meter-fill" style={format!("width: {}%", percentage)}></div>
                    </div>
                    <div class="meter-value">{ format_confidence(result.confidence) }</div>
                </div>
            </div>
            <div class="detailed-results">
                <h3>{"About this finding"}</h3>
                <p class="result-description">{ &result.description }</p>
                <h3>{"Recommendation"}</h3>
                <p class="result-recommendation">{ &result.recommendation }</p>
            </div>
        </div>
    }
}
