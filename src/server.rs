use std::io;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use ntex::web;
use ntex::web::HttpResponse;
use ntex_files::NamedFile;
use spdlog::{debug, error, info, warn};

use crate::config::Config;
use crate::csrf::CsrfSigner;
use crate::error::StoreError;
use crate::form::{validate, Field, FieldError, FormErrors};
use crate::post::{PostFields, PostForm, PostId};
use crate::store::PostStore;
use crate::view::form_renderer::FormTarget;
use crate::view::Views;

/// Rich text bodies can be much larger than the default urlencoded limit
pub const MAX_FORM_SIZE: usize = 2 * 1024 * 1024;

const NEW_POST_PATH: &str = "/new-post";

/// Everything a request needs, built once at startup and shared read-only.
pub struct AppState {
    pub store: PostStore,
    pub views: Views,
    pub csrf: CsrfSigner,
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn from_config(config: &Config) -> io::Result<AppState> {
        let location = &config.database.location;
        let store = match PostStore::open(location, config.database.pool_size()) {
            Ok(store) => store,
            Err(e) => return Err(io::Error::new(
                ErrorKind::Other, format!("Error opening database {}: {}", location.display(), e))),
        };
        info!("Database {} connected and table created successfully", location.display());

        match store.count() {
            Ok(count) => info!("Posts in the database: {}", count),
            Err(e) => warn!("Could not count posts: {}", e),
        }

        let views = Views::load(&config.paths.template_dir)?;
        let csrf = CsrfSigner::new(&config.security.secret_key, config.security.csrf_time_limit());

        Ok(AppState {
            store,
            views,
            csrf,
            public_dir: config.paths.public_dir.clone(),
        })
    }
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .header("Location", location)
        .content_type("text/html; charset=utf-8")
        .finish()
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body("<h1>Not Found</h1>")
}

fn server_error(action: &str, e: &StoreError) -> HttpResponse {
    error!("Error {}: {}", action, e);
    HttpResponse::InternalServerError()
        .content_type("text/html; charset=utf-8")
        .body("<h1>Internal Server Error</h1>")
}

fn edit_path(id: PostId) -> String {
    format!("/edit-post/{}", id)
}

/// Validation plus the anti-forgery check, reported together.
fn check_submission(csrf: &CsrfSigner, form: &PostForm) -> Result<PostFields, FormErrors> {
    let validated = validate(form);

    if let Err(e) = csrf.verify(&form.csrf_token) {
        warn!("Rejected form submission: {}", e);
        let mut errors = validated.err().unwrap_or_default();
        errors.push(Field::CsrfToken, FieldError::Csrf(e));
        return Err(errors);
    }

    validated
}

fn render_form(state: &AppState, target: &FormTarget, form: &PostForm, errors: &FormErrors) -> HttpResponse {
    let token = state.csrf.issue();
    html(state.views.form.render(target, form, errors, &token))
}

#[web::get("/")]
async fn get_all_posts(state: web::types::State<Arc<AppState>>) -> HttpResponse {
    // A broken table still renders the page, just without posts
    let posts = match state.store.get_all() {
        Ok(posts) => posts,
        Err(e) => {
            error!("Error fetching records: {}", e);
            vec![]
        }
    };
    debug!("Number of records fetched: {}", posts.len());

    html(state.views.list.render(&posts))
}

#[web::get("/post/{post_id}")]
async fn show_post(path: web::types::Path<i64>, state: web::types::State<Arc<AppState>>) -> HttpResponse {
    let id = PostId(path.into_inner());
    match state.store.get_by_id(id) {
        Ok(post) => html(state.views.post.render(&post)),
        Err(StoreError::NotFound(_)) => not_found(),
        Err(e) => server_error("loading post", &e),
    }
}

#[web::get("/new-post")]
async fn new_post_form(state: web::types::State<Arc<AppState>>) -> HttpResponse {
    let target = FormTarget { action: NEW_POST_PATH, is_edit: false };
    render_form(&state, &target, &PostForm::default(), &FormErrors::default())
}

#[web::post("/new-post")]
async fn add_new_post(form: web::types::Form<PostForm>, state: web::types::State<Arc<AppState>>) -> HttpResponse {
    let form = form.into_inner();
    let fields = match check_submission(&state.csrf, &form) {
        Ok(fields) => fields,
        Err(errors) => {
            let target = FormTarget { action: NEW_POST_PATH, is_edit: false };
            return render_form(&state, &target, &form, &errors);
        }
    };

    match state.store.create(&fields) {
        Ok(id) => {
            info!("Created post {}: {}", id, fields.title);
            redirect("/")
        }
        Err(e) => server_error("creating post", &e),
    }
}

#[web::get("/edit-post/{post_id}")]
async fn edit_post_form(path: web::types::Path<i64>, state: web::types::State<Arc<AppState>>) -> HttpResponse {
    let id = PostId(path.into_inner());
    let post = match state.store.get_by_id(id) {
        Ok(post) => post,
        Err(StoreError::NotFound(_)) => return not_found(),
        Err(e) => return server_error("loading post", &e),
    };

    let action = edit_path(id);
    let target = FormTarget { action: &action, is_edit: true };
    render_form(&state, &target, &PostForm::from(&post), &FormErrors::default())
}

#[web::post("/edit-post/{post_id}")]
async fn edit_post(
    path: web::types::Path<i64>,
    form: web::types::Form<PostForm>,
    state: web::types::State<Arc<AppState>>) -> HttpResponse {
    let id = PostId(path.into_inner());
    match state.store.get_by_id(id) {
        Ok(_) => {}
        Err(StoreError::NotFound(_)) => return not_found(),
        Err(e) => return server_error("loading post", &e),
    };

    let form = form.into_inner();
    let fields = match check_submission(&state.csrf, &form) {
        Ok(fields) => fields,
        Err(errors) => {
            let action = edit_path(id);
            let target = FormTarget { action: &action, is_edit: true };
            return render_form(&state, &target, &form, &errors);
        }
    };

    match state.store.update(id, &fields) {
        Ok(()) => {
            info!("Updated post {}", id);
            redirect(&format!("/post/{}", id))
        }
        Err(StoreError::NotFound(_)) => not_found(),
        Err(e) => server_error("updating post", &e),
    }
}

#[web::get("/delete/{post_id}")]
async fn delete_post(path: web::types::Path<i64>, state: web::types::State<Arc<AppState>>) -> HttpResponse {
    let id = PostId(path.into_inner());
    match state.store.delete(id) {
        Ok(()) => info!("Deleted post {}", id),
        Err(StoreError::NotFound(_)) => debug!("Post {} was already gone", id),
        Err(e) => return server_error("deleting post", &e),
    }

    redirect("/")
}

#[web::get("/about")]
async fn about(state: web::types::State<Arc<AppState>>) -> HttpResponse {
    html(state.views.about.render())
}

#[web::get("/contact")]
async fn contact(state: web::types::State<Arc<AppState>>) -> HttpResponse {
    html(state.views.contact.render())
}

#[web::get("/public/{file_name}")]
async fn public_files(path: web::types::Path<String>, state: web::types::State<Arc<AppState>>) -> Result<NamedFile, web::Error> {
    if path.contains("..") {
        return Err(web::error::ErrorForbidden("Access forbidden").into());
    }

    let file_path = state.public_dir.join(path.into_inner());
    Ok(NamedFile::open(file_path)?)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_all_posts)
        .service(show_post)
        .service(new_post_form)
        .service(add_new_post)
        .service(edit_post_form)
        .service(edit_post)
        .service(delete_post)
        .service(about)
        .service(contact)
        .service(public_files);
}

pub async fn server_run(config: Config) -> io::Result<()> {
    let app_state = Arc::new(AppState::from_config(&config)?);

    let bind_addr = config.server.address.clone();
    let bind_port = config.server.port;

    web::HttpServer::new(move || {
        web::App::new()
            .state(app_state.clone())
            .state(web::types::FormConfig::default().limit(MAX_FORM_SIZE))
            .configure(configure_routes)
    })
        .bind((bind_addr, bind_port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local};
    use ntex::http::{header, StatusCode};
    use ntex::web::test;
    use ntex::web::{App, WebResponse};
    use tempfile::TempDir;

    use crate::text_utils::format_post_date;

    use super::*;

    fn test_state() -> (Arc<AppState>, TempDir) {
        let dir = TempDir::new().unwrap();
        let res_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("res");
        let state = AppState {
            store: PostStore::open(&dir.path().join("posts.db"), 2).unwrap(),
            views: Views::load(&res_dir.join("template")).unwrap(),
            csrf: CsrfSigner::new("test secret", Duration::hours(1)),
            public_dir: res_dir.join("public"),
        };
        (Arc::new(state), dir)
    }

    fn fields(title: &str) -> PostFields {
        PostFields {
            title: title.to_string(),
            subtitle: "World".to_string(),
            author: "A".to_string(),
            img_url: "https://x.com/i.jpg".to_string(),
            body: "<p>x</p>".to_string(),
        }
    }

    fn form_body(title: &str, img_url: &str, token: &str) -> String {
        serde_urlencoded::to_string([
            ("title", title),
            ("subtitle", "World"),
            ("author", "A"),
            ("img_url", img_url),
            ("body", "<p>x</p>"),
            ("csrf_token", token),
        ]).unwrap()
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> WebResponse {
        let app = test::init_service(App::new()
            .state(state.clone())
            .configure(configure_routes)).await;
        test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await
    }

    async fn post(state: &Arc<AppState>, uri: &str, body: String) -> WebResponse {
        let app = test::init_service(App::new()
            .state(state.clone())
            .state(web::types::FormConfig::default().limit(MAX_FORM_SIZE))
            .configure(configure_routes)).await;
        let req = test::TestRequest::post()
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .set_payload(body)
            .to_request();
        test::call_service(&app, req).await
    }

    async fn body_text(resp: WebResponse) -> String {
        let body = test::read_body(resp).await;
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn location(resp: &WebResponse) -> String {
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string()
    }

    #[ntex::test]
    async fn test_list_empty() {
        let (state, _dir) = test_state();
        let resp = get(&state, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("No posts yet."));
    }

    #[ntex::test]
    async fn test_list_unreadable_table() {
        let (state, dir) = test_state();
        state.store.create(&fields("Hidden")).unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("posts.db")).unwrap();
        conn.execute_batch("DROP TABLE blog_post").unwrap();
        drop(conn);

        let resp = get(&state, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("No posts yet."));
        assert!(!body.contains("Hidden"));
    }

    #[ntex::test]
    async fn test_list_posts() {
        let (state, _dir) = test_state();
        state.store.create(&fields("First post")).unwrap();
        state.store.create(&fields("Second post")).unwrap();

        let body = body_text(get(&state, "/").await).await;
        assert!(body.contains("First post"));
        assert!(body.contains("Second post"));
        assert!(body.contains("href=\"/post/2\""));
        assert!(!body.contains("No posts yet."));
    }

    #[ntex::test]
    async fn test_show_post() {
        let (state, _dir) = test_state();
        let id = state.store.create(&fields("Hello")).unwrap();

        let resp = get(&state, &format!("/post/{}", id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Hello"));
        assert!(body.contains("<p>x</p>"));
        assert!(body.contains(&format_post_date(&Local::now().date_naive())));
    }

    #[ntex::test]
    async fn test_show_missing_post() {
        let (state, _dir) = test_state();
        let resp = get(&state, "/post/99").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(!body_text(resp).await.contains("Posted by"));

        for uri in ["/post/not-a-number", "/edit-post/abc", "/delete/abc", "/post/99999999999999999999"] {
            let resp = get(&state, uri).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[ntex::test]
    async fn test_new_post_form() {
        let (state, _dir) = test_state();
        let resp = get(&state, "/new-post").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("New Post"));
        assert!(body.contains("name=\"csrf_token\""));
        assert!(body.contains("action=\"/new-post\""));
    }

    #[ntex::test]
    async fn test_create_post() {
        let (state, _dir) = test_state();
        let token = state.csrf.issue();
        let resp = post(&state, "/new-post", form_body("Hello", "https://x.com/i.jpg", &token)).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/");

        let post = state.store.get_by_id(PostId(1)).unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.subtitle, "World");
        assert_eq!(post.author, "A");
        assert_eq!(post.body, "<p>x</p>");
        assert_eq!(post.img_url, "https://x.com/i.jpg");
        assert_eq!(post.date, format_post_date(&Local::now().date_naive()));
    }

    #[ntex::test]
    async fn test_create_empty_title() {
        let (state, _dir) = test_state();
        let token = state.csrf.issue();
        let resp = post(&state, "/new-post", form_body("", "https://x.com/i.jpg", &token)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("This field is required."));
        // submitted values come back
        assert!(body.contains("value=\"World\""));
        assert!(state.store.get_all().unwrap().is_empty());
    }

    #[ntex::test]
    async fn test_create_invalid_url() {
        let (state, _dir) = test_state();
        let token = state.csrf.issue();
        let resp = post(&state, "/new-post", form_body("Hello", "not-a-url", &token)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Invalid URL."));
        assert!(body.contains("value=\"not-a-url\""));
        assert!(state.store.get_all().unwrap().is_empty());
    }

    #[ntex::test]
    async fn test_create_without_token() {
        let (state, _dir) = test_state();
        let resp = post(&state, "/new-post", form_body("Hello", "https://x.com/i.jpg", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("The CSRF token is missing."));
        assert!(state.store.get_all().unwrap().is_empty());

        let other = CsrfSigner::new("someone else", Duration::hours(1));
        let resp = post(&state, "/new-post", form_body("Hello", "https://x.com/i.jpg", &other.issue())).await;
        assert!(body_text(resp).await.contains("The CSRF token is invalid."));
        assert!(state.store.get_all().unwrap().is_empty());
    }

    #[ntex::test]
    async fn test_edit_form_prefilled() {
        let (state, _dir) = test_state();
        let id = state.store.create(&fields("Original")).unwrap();

        let resp = get(&state, &edit_path(id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Edit Post"));
        assert!(body.contains("value=\"Original\""));
        assert!(body.contains("value=\"https://x.com/i.jpg\""));
        assert!(body.contains(&format!("action=\"/edit-post/{}\"", id)));

        let resp = get(&state, "/edit-post/42").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[ntex::test]
    async fn test_edit_post() {
        let (state, _dir) = test_state();
        let id = state.store.create(&fields("Original")).unwrap();
        let before = state.store.get_by_id(id).unwrap();

        let token = state.csrf.issue();
        let resp = post(&state, &edit_path(id), form_body("Changed", "https://y.org/j.png", &token)).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/post/{}", id));

        let after = state.store.get_by_id(id).unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.date, before.date);
        assert_eq!(after.title, "Changed");
        assert_eq!(after.img_url, "https://y.org/j.png");
        assert_eq!(after.subtitle, before.subtitle);
        assert_eq!(after.body, before.body);
    }

    #[ntex::test]
    async fn test_edit_invalid_keeps_row() {
        let (state, _dir) = test_state();
        let id = state.store.create(&fields("Original")).unwrap();

        let token = state.csrf.issue();
        let resp = post(&state, &edit_path(id), form_body("", "https://x.com/i.jpg", &token)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("This field is required."));
        assert!(body.contains("Edit Post"));
        assert_eq!(state.store.get_by_id(id).unwrap().title, "Original");
    }

    #[ntex::test]
    async fn test_edit_missing_post() {
        let (state, _dir) = test_state();
        let token = state.csrf.issue();
        let resp = post(&state, "/edit-post/7", form_body("Hello", "https://x.com/i.jpg", &token)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(state.store.get_all().unwrap().is_empty());
    }

    #[ntex::test]
    async fn test_delete_post() {
        let (state, _dir) = test_state();
        let id = state.store.create(&fields("Hello")).unwrap();

        let resp = get(&state, &format!("/delete/{}", id)).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/");
        assert!(matches!(state.store.get_by_id(id), Err(StoreError::NotFound(_))));

        // deleting again still lands on the list page
        let resp = get(&state, &format!("/delete/{}", id)).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/");
    }

    #[ntex::test]
    async fn test_static_pages() {
        let (state, _dir) = test_state();
        let resp = get(&state, "/about").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("About Me"));

        let resp = get(&state, "/contact").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Contact Me"));
    }

    #[ntex::test]
    async fn test_public_files() {
        let (state, _dir) = test_state();
        let resp = get(&state, "/public/styles.css").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get(&state, "/public/missing.css").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
