/// HTTP handlers for the web UI.
///
/// 1. index     – empty form
/// 2. load      – upload a file and make it the active document
/// 3. ask       – answer a question against the active document
/// 4. recommend – TF-IDF search over the resource catalog
///
/// Every handler answers with a rendered page; failures become status text.
use std::path::{Path, PathBuf};

use axum::extract::{Form, Multipart, Query, State};
use axum::response::Html;
use serde::Deserialize;
use tracing::{error, info};

use crate::rag::session::AskOutcome;
use crate::web::page::{PageView, render};
use crate::web::server::WebContext;

/// Upper bound of the recommendation slider.
pub const MAX_TOP_N: usize = 10;

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub query: String,
    /// Kept as text so a malformed value falls back to the default.
    pub top_n: Option<String>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn page(view: PageView) -> Html<String> {
    Html(render(&view, MAX_TOP_N))
}

fn default_view(ctx: &WebContext) -> PageView {
    PageView {
        top_n: ctx.config.recommend.default_top_n.clamp(1, MAX_TOP_N),
        ..PageView::default()
    }
}

/// Keeps only the final path component of a client-supplied file name.
fn upload_name(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim()).file_name()?.to_str()?.to_string();
    (!name.is_empty()).then_some(name)
}

struct Upload {
    // Removed with the directory when dropped.
    _dir: tempfile::TempDir,
    path: PathBuf,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(name) = field.file_name().and_then(upload_name) else {
            return Ok(None);
        };
        let data = field.bytes().await.map_err(|e| e.to_string())?;
        if data.is_empty() {
            return Ok(None);
        }

        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let path = dir.path().join(name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| e.to_string())?;
        return Ok(Some(Upload { _dir: dir, path }));
    }
    Ok(None)
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn index(State(ctx): State<WebContext>) -> Html<String> {
    page(default_view(&ctx))
}

pub async fn load(State(ctx): State<WebContext>, mut multipart: Multipart) -> Html<String> {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            error!("Upload failed: {e}");
            let view = PageView {
                status: format!("❌ Erreur: {e}"),
                ..default_view(&ctx)
            };
            return page(view);
        }
    };

    let session = ctx.session.clone();
    let status = tokio::task::spawn_blocking(move || {
        let mut session = session.blocking_lock();
        let status = session.load_pdf(upload.as_ref().map(|u| u.path.as_path()));
        drop(upload);
        status
    })
    .await
    .unwrap_or_else(|e| format!("❌ Erreur: {e}"));
    info!("Load status: {status}");

    let view = PageView {
        status,
        ..default_view(&ctx)
    };
    page(view)
}

pub async fn ask(State(ctx): State<WebContext>, Form(form): Form<AskForm>) -> Html<String> {
    let session = ctx.session.clone();
    let question = form.question.clone();
    let outcome = tokio::task::spawn_blocking(move || session.blocking_lock().ask(&question))
        .await
        .unwrap_or_else(|e| AskOutcome {
            answer: format!("[X] Erreur: {e}"),
            ..AskOutcome::default()
        });

    let view = PageView {
        question: form.question,
        answer: outcome.answer,
        sources: outcome.sources,
        ..default_view(&ctx)
    };
    page(view)
}

pub async fn recommend(
    State(ctx): State<WebContext>,
    Query(params): Query<RecommendQuery>,
) -> Html<String> {
    let top_n = params
        .top_n
        .as_deref()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(ctx.config.recommend.default_top_n)
        .clamp(1, MAX_TOP_N);
    let recommendations = ctx.recommender.search(&params.query, top_n);

    let view = PageView {
        query: params.query,
        top_n,
        recommendations: Some(recommendations),
        ..default_view(&ctx)
    };
    page(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedder::mock::MockEmbedder;
    use crate::rag::llm::{LanguageModel, LlmError};
    use crate::rag::session::{NO_FILE_MESSAGE, NO_INDEX_MESSAGE};
    use crate::rag::{Pipeline, Session};
    use crate::recommend::Recommender;
    use crate::recommend::catalog::CatalogEntry;
    use std::sync::Arc;
    use tokio::sync::Mutex as TokioMutex;

    struct FixedLlm;

    impl LanguageModel for FixedLlm {
        fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok("réponse".to_string())
        }
    }

    fn context() -> WebContext {
        let config = Config::default();
        let pipeline =
            Pipeline::new(Arc::new(MockEmbedder::new(8)), Arc::new(FixedLlm), &config).unwrap();
        let recommender = Recommender::new(
            vec![
                CatalogEntry {
                    title: "Intro to Machine Learning".to_string(),
                    description: "Regression and classification".to_string(),
                    url: "https://example.org/ml".to_string(),
                    platform: "Coursera".to_string(),
                },
                CatalogEntry {
                    title: "French Cooking Basics".to_string(),
                    description: "Sauces".to_string(),
                    url: "https://example.org/cooking".to_string(),
                    platform: "YouTube".to_string(),
                },
            ],
            config.recommend.max_features,
        );
        WebContext {
            session: Arc::new(TokioMutex::new(Session::new(Arc::new(pipeline), 2))),
            recommender: Arc::new(recommender),
            config: Arc::new(config),
        }
    }

    #[test]
    fn test_upload_name_strips_directories() {
        assert_eq!(upload_name("../../etc/cours.pdf").as_deref(), Some("cours.pdf"));
        assert_eq!(upload_name("C:/tmp/a.txt").as_deref(), Some("a.txt"));
        assert_eq!(upload_name("  "), None);
        assert_eq!(upload_name(".."), None);
    }

    #[tokio::test]
    async fn test_ask_before_load_shows_no_index_message() {
        let Html(html) = ask(
            State(context()),
            Form(AskForm {
                question: "Qu'est-ce qu'un shard ?".to_string(),
            }),
        )
        .await;
        assert!(html.contains(&*html_escape::encode_text(NO_INDEX_MESSAGE)));
    }

    #[tokio::test]
    async fn test_recommend_clamps_top_n() {
        let Html(html) = recommend(
            State(context()),
            Query(RecommendQuery {
                query: "machine learning".to_string(),
                top_n: Some("99".to_string()),
            }),
        )
        .await;
        assert!(html.contains("value=\"10\""));
        let ml = html.find("Intro to Machine Learning").unwrap();
        let cooking = html.find("French Cooking Basics").unwrap();
        assert!(ml < cooking);
    }

    #[tokio::test]
    async fn test_recommend_blank_query_has_no_rows() {
        let Html(html) = recommend(
            State(context()),
            Query(RecommendQuery {
                query: String::new(),
                top_n: None,
            }),
        )
        .await;
        assert!(html.contains("Aucun résultat"));
    }

    /// Serves the full router on an ephemeral port.
    async fn serve(ctx: WebContext) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::web::WebServer::new(ctx).router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn upload(base: &str, field: &str, file_name: &str, data: &str) -> String {
        let boundary = "docqa-form-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {data}\r\n\
             --{boundary}--\r\n"
        );
        reqwest::Client::new()
            .post(format!("{base}/load"))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_ask_through_router() {
        let ctx = context();
        let session = ctx.session.clone();
        let base = serve(ctx).await;

        let html = upload(
            &base,
            "file",
            "cours.txt",
            "Un shard contient une partie des données.\nLe mongos route les requêtes.",
        )
        .await;
        assert!(html.contains("[✓]"), "unexpected page: {html}");

        let label = session
            .lock()
            .await
            .current_label()
            .map(str::to_string)
            .unwrap();
        assert!(label.ends_with("cours.txt"));
        // Staged upload is gone once indexed.
        assert!(!Path::new(&label).exists());

        let html = reqwest::Client::new()
            .post(format!("{base}/ask"))
            .form(&[("question", "Que fait le mongos ?")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("réponse"));
        assert!(html.contains("Le mongos route les requêtes."));
    }

    #[tokio::test]
    async fn test_upload_without_file_field_keeps_session_empty() {
        let ctx = context();
        let session = ctx.session.clone();
        let base = serve(ctx).await;

        let html = upload(&base, "attachment", "cours.txt", "du texte").await;
        assert!(html.contains(NO_FILE_MESSAGE));
        assert!(!session.lock().await.has_index());

        let html = upload(&base, "file", "slides.pptx", "du texte").await;
        assert!(html.contains("❌ Erreur"));
        assert!(!session.lock().await.has_index());
    }

    #[tokio::test]
    async fn test_malformed_top_n_falls_back_to_default() {
        let base = serve(context()).await;
        let response = reqwest::Client::new()
            .get(format!("{base}/recommend?query=machine+learning&top_n=beaucoup"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let html = response.text().await.unwrap();
        assert!(html.contains("value=\"3\""));
        assert!(html.contains("Intro to Machine Learning"));
    }
}
