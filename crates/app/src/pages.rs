//! Server-side HTML for the storefront pages.
//!
//! Markup keeps the Tailwind utility classes of the original design; styles
//! come from the Tailwind CDN build configured for class-based dark mode.

use std::{fmt::Write as _, sync::LazyLock};

use storefront_core::{
    form::{Category, Country, Currency, FormErrors, StoreDraft},
    AvailabilitySnapshot, DomainStatus, Product, Theme,
};
use url::Url;

const SITE_TITLE: &str = "ExpressIT Store";
const SITE_DESCRIPTION: &str = "Build your online store fast";
const SKELETON_CARDS: usize = 8;

/// Only its path is ever emitted; the host never leaves this module.
static PRODUCT_ROUTE: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("http://storefront.invalid/products/").expect("product route base is valid")
});

const STORE_FORM_SCRIPT: &str = r#"
(() => {
  const form = document.getElementById('store-form');
  if (!form) return;
  const domain = form.elements.namedItem('domain');
  const sessionField = form.elements.namedItem('session');
  const box = document.getElementById('domain-box');
  const message = document.getElementById('domain-message');
  const submit = document.getElementById('submit-button');
  const tones = {
    available: ['border-green-500', 'text-green-600'],
    taken: ['border-red-500', 'text-red-600'],
    failed: ['border-red-500', 'text-red-600'],
  };
  let session = form.dataset.session || null;
  let opening = null;
  let latest = null;
  let edit = 0;
  let queue = Promise.resolve();
  const paint = (status, text) => {
    const [border, tone] = tones[status] || ['border-gray-300', 'text-gray-500'];
    box.className = 'flex border rounded-md overflow-hidden ' + border;
    message.className = 'mt-1 text-xs ' + tone;
    message.textContent = text;
    submit.disabled = status === 'checking';
  };
  // Only a snapshot for the value currently in the field may be shown.
  const render = () => {
    if (latest && latest.domain === domain.value.trim()) {
      paint(latest.status, latest.message);
    } else {
      paint('idle', '');
    }
  };
  const listen = (id) => {
    const events = new EventSource('/stores/sessions/' + id + '/events');
    events.addEventListener('domain', (event) => {
      latest = JSON.parse(event.data);
      render();
    });
  };
  const ensureSession = () => {
    if (session) return Promise.resolve(session);
    if (!opening) {
      opening = fetch('/stores/sessions', { method: 'POST' })
        .then((response) => response.json())
        .then((body) => {
          session = body.id;
          form.dataset.session = session;
          sessionField.value = session;
          listen(session);
          return session;
        })
        .catch((err) => {
          opening = null;
          throw err;
        });
    }
    return opening;
  };
  if (session) listen(session);
  domain.addEventListener('input', () => {
    edit += 1;
    const payload = JSON.stringify({ value: domain.value, edit });
    render();
    // Posts go out one at a time so the server sees edits in order.
    queue = queue
      .then(ensureSession)
      .then((id) => fetch('/stores/sessions/' + id + '/domain', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: payload,
      }))
      .catch(() => {});
  });
  const feedback = (field) => {
    const input = form.elements.namedItem(field);
    input.addEventListener('blur', async () => {
      const response = await fetch('/stores/feedback', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ [field]: input.value }),
      });
      if (!response.ok) return;
      const errors = await response.json();
      const target = document.getElementById(field + '-error');
      target.textContent = errors[field] || '';
      target.hidden = !errors[field];
    });
  };
  feedback('name');
  feedback('email');
})();
"#;

const PRODUCT_GRID_SCRIPT: &str = r#"
(() => {
  const grid = document.getElementById('product-grid');
  if (!grid) return;
  fetch(grid.dataset.source)
    .then((response) => response.text())
    .then((html) => { grid.innerHTML = html; })
    .catch(() => { grid.innerHTML = ''; });
})();
"#;

/// Escapes text for use in element content and double-quoted attributes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Wraps page content in the shared document shell with the theme toggle header.
pub fn layout(theme: Theme, title: &str, body: &str) -> String {
    let page_title = if title.is_empty() {
        SITE_TITLE.to_string()
    } else {
        format!("{} | {SITE_TITLE}", escape(title))
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{theme}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="description" content="{SITE_DESCRIPTION}">
<title>{page_title}</title>
<script src="https://cdn.tailwindcss.com?plugins=forms,line-clamp"></script>
<script>tailwind.config = {{ darkMode: 'class' }};</script>
</head>
<body class="antialiased min-h-screen bg-gray-50 text-gray-800 dark:bg-gray-950 dark:text-gray-100">
<header class="border-b bg-white dark:bg-gray-900 p-4 flex items-center justify-between">
<h1 class="text-xl font-bold text-gray-900 dark:text-white">🛍️ {SITE_TITLE}</h1>
<form method="post" action="/theme">
<button type="submit" class="px-3 py-1 text-sm font-medium bg-gray-200 dark:bg-gray-700 text-gray-800 dark:text-white rounded hover:bg-gray-300 dark:hover:bg-gray-600 transition">{label}</button>
</form>
</header>
<main>{body}</main>
</body>
</html>
"#,
        theme = theme.as_str(),
        label = theme.toggle_label(),
    )
}

/// Everything the store creation form needs to render.
pub struct StoreFormView<'a> {
    pub theme: Theme,
    /// Set once the form has a session; pages rendered before any input carry none.
    pub session_id: Option<&'a str>,
    pub draft: &'a StoreDraft,
    pub errors: &'a FormErrors,
    pub availability: &'a AvailabilitySnapshot,
    pub domain_suffix: &'a str,
    pub alert: Option<&'a str>,
}

pub fn store_form_page(view: &StoreFormView<'_>) -> String {
    let mut body = String::new();
    body.push_str(
        r#"<div class="flex min-h-screen items-center justify-center bg-gray-50 dark:bg-gray-950 p-4">
<div class="w-full max-w-3xl rounded-lg bg-white dark:bg-gray-900 p-8 shadow-md">
<h1 class="text-2xl font-bold text-gray-800 dark:text-white">Create a store</h1>
<p class="mb-6 mt-2 text-gray-600 dark:text-gray-400">Add your basic store information and complete the setup</p>
"#,
    );

    if let Some(alert) = view.alert {
        let _ = write!(
            body,
            r#"<div role="alert" class="mb-6 rounded-md border border-red-300 bg-red-50 p-3 text-sm text-red-700">{}</div>
"#,
            escape(alert)
        );
    }

    let _ = write!(
        body,
        r#"<form id="store-form" method="post" action="/stores" class="space-y-8" novalidate data-session="{session}">
<input type="hidden" name="session" value="{session}">
"#,
        session = escape(view.session_id.unwrap_or_default())
    );

    let name_error = view.errors.name.map(|err| err.to_string());
    body.push_str(&field_row(
        "Store Name",
        Some("A great name boosts your brand&apos;s identity."),
        &format!(
            r#"<input type="text" name="name" placeholder="Your store name" value="{value}" class="{class}" required>
{error}"#,
            value = escape(&view.draft.name),
            class = input_class(name_error.is_some()),
            error = error_line("name", name_error.as_deref()),
        ),
    ));

    body.push_str(&field_row(
        "Domain",
        Some("Your store&apos;s unique subdomain."),
        &domain_input(view),
    ));

    body.push_str(&field_row(
        "Location",
        None,
        &select(
            "location",
            Country::ALL
                .iter()
                .map(|country| (country.as_str(), country.as_str(), *country == view.draft.location)),
        ),
    ));
    body.push_str(&field_row(
        "Category",
        None,
        &select(
            "category",
            Category::ALL
                .iter()
                .map(|category| (category.as_str(), category.as_str(), *category == view.draft.category)),
        ),
    ));
    body.push_str(&field_row(
        "Currency",
        None,
        &select(
            "currency",
            Currency::ALL
                .iter()
                .map(|currency| (currency.code(), currency.label(), *currency == view.draft.currency)),
        ),
    ));

    let email_error = view.errors.email.map(|err| err.to_string());
    body.push_str(&field_row(
        "Contact Email",
        None,
        &format!(
            r#"<input type="email" name="email" placeholder="you@example.com" value="{value}" class="{class}" required>
{error}"#,
            value = escape(&view.draft.email),
            class = input_class(email_error.is_some()),
            error = error_line("email", email_error.as_deref()),
        ),
    ));

    let disabled = if view.availability.status == DomainStatus::Checking {
        " disabled"
    } else {
        ""
    };
    let _ = write!(
        body,
        r#"<div class="flex justify-end">
<button id="submit-button" type="submit" class="bg-indigo-600 text-white px-6 py-2 rounded-md font-semibold hover:bg-indigo-500 disabled:opacity-50 disabled:cursor-not-allowed"{disabled}>Create Store</button>
</div>
</form>
</div>
</div>
<script>{STORE_FORM_SCRIPT}</script>
"#
    );

    layout(view.theme, "Create a store", &body)
}

fn domain_input(view: &StoreFormView<'_>) -> String {
    let availability = view.availability;
    let domain_error = view.errors.domain.map(|err| err.to_string());

    let (border, tone) = match (availability.status, domain_error.is_some()) {
        (_, true) | (DomainStatus::Taken | DomainStatus::Failed, false) => {
            ("border-red-500", "text-red-600")
        }
        (DomainStatus::Available, false) => ("border-green-500", "text-green-600"),
        _ => ("border-gray-300", "text-gray-500"),
    };
    let message = domain_error
        .as_deref()
        .unwrap_or(availability.message);

    format!(
        r#"<div id="domain-box" class="flex border rounded-md overflow-hidden {border}">
<input type="text" name="domain" value="{value}" class="flex-grow p-2 text-sm border-0 dark:bg-gray-800" autocomplete="off" required>
<span class="px-3 py-2 text-sm bg-gray-100 text-gray-600 dark:bg-gray-700 dark:text-gray-300">{suffix}</span>
</div>
<p id="domain-message" class="mt-1 text-xs {tone}" aria-live="polite">{message}</p>"#,
        value = escape(&view.draft.domain),
        suffix = escape(view.domain_suffix),
        message = escape(message),
    )
}

fn field_row(label: &str, hint: Option<&str>, control: &str) -> String {
    let hint = hint
        .map(|hint| format!(r#"<p class="text-xs text-gray-500 mt-1">{hint}</p>"#))
        .unwrap_or_default();
    format!(
        r#"<div class="flex justify-between gap-6">
<div class="w-2/5">
<label class="font-semibold text-gray-800 dark:text-gray-100 flex items-center gap-2">{label}</label>
{hint}
</div>
<div class="w-3/5">
{control}
</div>
</div>
"#
    )
}

fn select<'a>(name: &str, options: impl Iterator<Item = (&'a str, &'a str, bool)>) -> String {
    let mut out = format!(r#"<select name="{name}" class="{}">"#, input_class(false));
    for (value, label, selected) in options {
        let selected = if selected { " selected" } else { "" };
        let _ = write!(
            out,
            r#"<option value="{}"{selected}>{}</option>"#,
            escape(value),
            escape(label)
        );
    }
    out.push_str("</select>");
    out
}

fn input_class(has_error: bool) -> &'static str {
    if has_error {
        "block w-full rounded-md shadow-sm sm:text-sm p-2.5 border-red-500 focus:ring-red-500 focus:border-red-500 dark:bg-gray-800"
    } else {
        "block w-full rounded-md shadow-sm sm:text-sm p-2.5 border-gray-300 focus:ring-indigo-500 focus:border-indigo-500 dark:bg-gray-800"
    }
}

fn error_line(field: &str, error: Option<&str>) -> String {
    match error {
        Some(message) => format!(
            r#"<p id="{field}-error" class="mt-1 text-xs text-red-600">{}</p>"#,
            escape(message)
        ),
        None => format!(r#"<p id="{field}-error" class="mt-1 text-xs text-red-600" hidden></p>"#),
    }
}

/// Listing shell: skeleton cards replaced by the card fragment once it loads.
pub fn products_page(theme: Theme, notice: Option<&str>) -> String {
    let mut body = String::from(
        r#"<div class="min-h-screen px-4 py-12">
<div class="max-w-7xl mx-auto">
<h1 class="text-3xl font-bold text-center mb-10">Our Products</h1>
"#,
    );
    if let Some(notice) = notice {
        let _ = write!(
            body,
            r#"<div role="status" class="mb-8 rounded-md border border-green-300 bg-green-50 p-3 text-center text-sm text-green-700">{}</div>
"#,
            escape(notice)
        );
    }
    body.push_str(
        r#"<div id="product-grid" data-source="/products/cards" class="grid grid-cols-1 sm:grid-cols-2 md:grid-cols-3 xl:grid-cols-4 gap-8">
"#,
    );
    for _ in 0..SKELETON_CARDS {
        body.push_str(
            r#"<div class="animate-pulse bg-white dark:bg-gray-900 border border-gray-200 dark:border-gray-800 rounded-lg overflow-hidden" data-skeleton>
<div class="aspect-square bg-gray-200 dark:bg-gray-800"></div>
<div class="p-4 space-y-3"><div class="h-4 bg-gray-200 dark:bg-gray-800 rounded"></div><div class="h-3 bg-gray-200 dark:bg-gray-800 rounded w-2/3"></div></div>
</div>
"#,
        );
    }
    let _ = write!(
        body,
        r#"</div>
<noscript><p class="mt-8 text-center"><a class="text-indigo-600 hover:underline" href="/products/cards">Show products</a></p></noscript>
</div>
</div>
<script>{PRODUCT_GRID_SCRIPT}</script>
"#
    );
    layout(theme, "Products", &body)
}

/// Card fragment swapped into the listing grid.
pub fn product_cards(products: &[Product]) -> String {
    if products.is_empty() {
        return String::from(
            r#"<p class="col-span-full text-center text-gray-500" data-empty>No products found.</p>"#,
        );
    }

    let mut out = String::new();
    for product in products {
        let _ = write!(
            out,
            r#"<a href="{href}" class="group" data-product-card>
<div class="bg-white dark:bg-gray-900 border border-gray-200 dark:border-gray-800 rounded-lg shadow-sm hover:shadow-md transition-all overflow-hidden flex flex-col">
<div class="aspect-square overflow-hidden">{image}</div>
<div class="p-4 flex flex-col justify-between flex-grow">
<h2 class="text-lg font-semibold text-gray-900 dark:text-white truncate">{name}</h2>
<p class="text-sm text-gray-600 dark:text-gray-400 line-clamp-2 mt-1">{description}</p>
<div class="mt-3 text-indigo-600 font-bold text-base">{price}</div>
</div>
</div>
</a>
"#,
            href = escape(&product_href(&product.id)),
            image = product_image(product, "w-full h-full object-cover group-hover:scale-105 transition-transform duration-300"),
            name = escape(&product.name),
            description = escape(&product.description),
            price = price_label(product),
        );
    }
    out
}

pub fn product_detail_page(theme: Theme, product: &Product) -> String {
    let video = product
        .video_url()
        .map(|url| {
            format!(
                r#"<video controls class="mt-4 w-full rounded-lg shadow" src="{}"></video>"#,
                escape(url)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<div class="min-h-screen px-4 py-12 md:py-20">
<div class="max-w-7xl mx-auto">
<div class="mb-8"><a href="/products" class="text-indigo-600 text-sm hover:underline transition">← Back to Products</a></div>
<div class="bg-white dark:bg-gray-900 rounded-xl shadow-xl overflow-hidden md:flex md:gap-10 md:p-8">
<div class="md:w-1/2 w-full">
<div class="relative w-full aspect-square overflow-hidden rounded-lg border">{image}</div>
{video}
</div>
<div class="md:w-1/2 w-full flex flex-col justify-between mt-8 md:mt-0">
<div class="space-y-4">
<h1 class="text-3xl md:text-4xl font-bold tracking-tight">{name}</h1>
<div class="text-sm bg-gray-100 text-gray-700 inline-block px-3 py-1 rounded-full uppercase tracking-wide font-medium">{category}</div>
<p class="text-gray-600 dark:text-gray-400 text-base leading-relaxed">{description}</p>
<div class="text-3xl font-bold text-indigo-600 mt-4">{price}</div>
</div>
<div class="mt-8">
<button type="button" class="w-full md:w-auto px-6 py-3 text-sm font-semibold bg-indigo-600 text-white rounded-lg hover:bg-indigo-500 shadow transition">Add to Cart</button>
</div>
</div>
</div>
</div>
</div>
"#,
        image = product_image(product, "object-cover w-full h-full transition-transform hover:scale-105 duration-300"),
        name = escape(&product.name),
        category = escape(product.category_label()),
        description = escape(&product.description),
        price = price_label(product),
    );
    layout(theme, &product.name, &body)
}

pub fn not_found_page(theme: Theme) -> String {
    let body = r#"<div class="flex min-h-[60vh] flex-col items-center justify-center gap-4 p-4">
<h1 class="text-4xl font-bold">404</h1>
<p class="text-gray-600 dark:text-gray-400">This page could not be found.</p>
<a href="/products" class="text-indigo-600 text-sm hover:underline">← Back to Products</a>
</div>
"#;
    layout(theme, "Not found", body)
}

fn product_image(product: &Product, class: &str) -> String {
    match product.primary_image() {
        Some(url) => format!(
            r#"<img src="{}" alt="{}" class="{class}">"#,
            escape(url),
            escape(&product.name)
        ),
        None => String::from(r#"<div class="w-full h-full bg-gray-100 dark:bg-gray-800"></div>"#),
    }
}

/// Detail page path with the id encoded as a single path segment.
fn product_href(id: &str) -> String {
    let mut url = PRODUCT_ROUTE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(id);
    }
    url.path().to_string()
}

fn price_label(product: &Product) -> String {
    match &product.price {
        Some(price) => format!("৳ {}", escape(&price.to_string())),
        None => String::from("৳ —"),
    }
}
