use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Local stand-in for the listing site: two listing pages, three detail pages
/// (the third with a malformed year) and the asset files they link to.
pub struct SiteStub {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SiteStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start site stub server");
        let base_url = format!("http://{}", server.server_addr());
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_base = base_url.clone();
        let thread_hits = Arc::clone(&hits);

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                *thread_hits
                    .lock()
                    .expect("lock hits")
                    .entry(path.clone())
                    .or_insert(0) += 1;

                let response = match route(&thread_base, &path) {
                    Some((content_type, body)) => {
                        let header = tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            content_type.as_bytes(),
                        )
                        .expect("build header");
                        tiny_http::Response::from_data(body).with_header(header)
                    }
                    None => tiny_http::Response::from_data(b"not found".to_vec())
                        .with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            hits,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("lock hits")
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for SiteStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(base: &str, path: &str) -> Option<(&'static str, Vec<u8>)> {
    let html = |body: String| Some(("text/html; charset=utf-8", body.into_bytes()));
    match path {
        "/page/1" => html(listing(&["book-one", "book-two"])),
        "/page/2" => html(listing(&["book-three"])),
        "/book-one/" => html(detail(
            base,
            "Book One",
            "2020",
            &[format!("{base}/files/book-one.pdf")],
            "book-one.jpg",
        )),
        "/book-two/" => html(detail(
            base,
            "Book Two",
            "2018",
            &[
                format!("{base}/files/book-two.epub"),
                format!("{base}/files/book-two.mobi"),
            ],
            "book-two.jpg",
        )),
        "/book-three/" => html(detail(base, "Book Three", "circa 2020", &[], "book-three.jpg")),
        p if p.starts_with("/files/") || p.starts_with("/img/") => Some((
            "application/octet-stream",
            format!("contents of {p}").into_bytes(),
        )),
        _ => None,
    }
}

fn listing(slugs: &[&str]) -> String {
    let entries = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<article>
  <a href="/{slug}/" rel="bookmark"><img src="/img/{slug}.jpg"></a>
  <h2 class="entry-title"><a href="/{slug}/" rel="bookmark">{slug}</a></h2>
</article>"#
            )
        })
        .collect::<String>();
    format!(
        r#"<!doctype html>
<html>
  <body>
    <main id="main-content">{entries}</main>
  </body>
</html>
"#
    )
}

fn detail(base: &str, title: &str, year: &str, downloads: &[String], image: &str) -> String {
    let links = downloads
        .iter()
        .map(|href| {
            format!(
                r#"<span class="download-links"><a href="{href}" target="_blank"><i></i>Download</a></span>"#
            )
        })
        .collect::<String>();
    format!(
        r#"<!doctype html>
<html>
  <body>
    <article class="single-post">
      <header class="entry-header">
        <h1 class="single-title">{title}</h1>
        <h4>A short description</h4>
        <div class="entry-body-thumbnail">
          <img class="attachment-post-thumbnail" src="{base}/img/{image}">
        </div>
        <div class="book-detail">
          <dl>
            <dt>Author:</dt><dd><a href="/author/jane/">Jane Doe</a></dd>
            <dt>ISBN-10:</dt><dd>1234567890</dd>
            <dt>Year:</dt><dd>{year}</dd>
            <dt>Pages:</dt><dd>300</dd>
            <dt>Language:</dt><dd>English</dd>
            <dt>File size:</dt><dd>5.2 MB</dd>
            <dt>File format:</dt><dd>PDF</dd>
            <dt>Category:</dt><dd><a href="/programming/">Programming</a></dd>
          </dl>
        </div>
      </header>
      <div class="entry-content">
        <p>Long description.</p>
      </div>
      <footer>{links}</footer>
    </article>
  </body>
</html>
"#
    )
}
