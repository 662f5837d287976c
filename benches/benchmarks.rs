use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use page_mirror::{derive_filename, resolve, Document, ResourceRules};
use url::Url;

const PAGE: &str = r#"
    <html>
        <head>
            <link rel="stylesheet" href="/style.css">
            <script src="/script.js"></script>
            <link rel="stylesheet" href="/theme.css">
            <script src="/utils.js"></script>
        </head>
        <body>
            <img src="/logo.png" alt="Logo">
            <img src="/banner.jpg" alt="Banner">
            <img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=" alt="Pixel">
            <a href="/about">About</a>
            <video src="/intro.mp4"></video>
        </body>
    </html>
"#;

fn bench_reference_discovery(c: &mut Criterion) {
    let rules = ResourceRules::with_media();

    c.bench_function("discover_references", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(PAGE.as_bytes()), Some("text/html")).unwrap();
            doc.references(&rules)
        });
    });
}

fn bench_url_resolution(c: &mut Criterion) {
    let base = Url::parse("https://example.com/subdir/index.html").unwrap();
    let test_urls = vec![
        "../style.css",
        "./script.js",
        "images/photo.jpg",
        "https://cdn.example.com/style.css",
        "//cdn.example.com/script.js",
        "icons.svg#home",
        "data:image/png;base64,iVBORw0KGgo=",
    ];

    c.bench_function("resolve_references", |b| {
        b.iter(|| {
            for raw in &test_urls {
                let _resolution = resolve(black_box(raw), &base);
            }
        });
    });
}

fn bench_filename_derivation(c: &mut Criterion) {
    let urls: Vec<Url> = vec![
        "https://example.com/logo.png",
        "https://cdn.example.com/assets/app.js?v=1234&lang=en",
        "https://example.com/path/with/multiple/special/chars?param=value&other=123",
    ]
    .into_iter()
    .map(|u| Url::parse(u).unwrap())
    .collect();
    let long = Url::parse(&format!("https://example.com/{}", "segment/".repeat(40))).unwrap();

    c.bench_function("derive_filenames", |b| {
        b.iter(|| {
            for url in &urls {
                let _name = derive_filename(black_box(url));
            }
        });
    });

    c.bench_function("derive_long_filename", |b| {
        b.iter(|| derive_filename(black_box(&long)));
    });
}

criterion_group!(
    benches,
    bench_reference_discovery,
    bench_url_resolution,
    bench_filename_derivation
);
criterion_main!(benches);
