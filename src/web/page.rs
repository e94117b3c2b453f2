//! HTML rendering for the single-page form.
use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::recommend::Recommendation;

/// Everything the page can show; blank fields render as empty boxes.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub status: String,
    pub question: String,
    pub answer: String,
    pub sources: String,
    pub query: String,
    pub top_n: usize,
    pub recommendations: Option<Vec<Recommendation>>,
}

fn recommendation_table(rows: &[Recommendation]) -> String {
    let mut html = String::from(
        "<table><thead><tr><th>title</th><th>url</th><th>platform</th></tr></thead><tbody>",
    );
    for row in rows {
        let _ = write!(
            html,
            "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td></tr>",
            text(&row.title),
            attr(&row.url),
            text(&row.url),
            text(&row.platform),
        );
    }
    html.push_str("</tbody></table>");
    html
}

pub fn render(view: &PageView, max_top_n: usize) -> String {
    let table = match &view.recommendations {
        Some(rows) if rows.is_empty() => "<p>Aucun résultat</p>".to_string(),
        Some(rows) => recommendation_table(rows),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head><meta charset="utf-8"><title>Chat PDF – Ollama</title></head>
<body>
<h1>Chat PDF (Ollama + RAG)</h1>

<section>
<h2>[1] Charger PDF</h2>
<form action="/load" method="post" enctype="multipart/form-data">
<input type="file" name="file" accept=".pdf,.txt">
<button type="submit">Charger le PDF</button>
</form>
<label>Statut</label>
<output id="status">{status}</output>
</section>

<section>
<h2>[2] Poser des questions</h2>
<form action="/ask" method="post">
<textarea name="question" rows="2" placeholder="Ex: Quel est le rôle d'un shard dans MongoDB ?">{question}</textarea>
<button type="submit">Poser la question</button>
</form>
<label>Réponse</label>
<pre id="answer">{answer}</pre>
<label>Sources (extraits du PDF)</label>
<pre id="sources">{sources}</pre>
</section>

<section>
<h2>[3] Recommandation de Modules</h2>
<form action="/recommend" method="get">
<input type="text" name="query" value="{query}" placeholder="Tapez votre recherche ici...">
<input type="range" name="top_n" min="1" max="{max_top_n}" step="1" value="{top_n}">
<button type="submit">Rechercher</button>
</form>
{table}
</section>
</body>
</html>
"#,
        status = text(&view.status),
        question = text(&view.question),
        answer = text(&view.answer),
        sources = text(&view.sources),
        query = attr(&view.query),
        top_n = view.top_n,
    )
}
