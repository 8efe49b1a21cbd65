//! Fetch-once cache for the viewer document.
//!
//! All `<pdf-embed>` instances share one cache keyed by viewer URL. The
//! first request for a location installs a shared in-flight future;
//! concurrent requesters await clones of that same future, so a location is
//! fetched at most once no matter how many instances attach at the same
//! time. Entries live for the lifetime of the page and are never evicted.
//!
//! A failed fetch is not retained: every awaiter observes the error, the
//! entry is dropped, and the next request fetches again.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use super::ViewerError;

/// Future returned by a fetcher: the viewer document body as text.
pub type FetchFuture = LocalBoxFuture<'static, Result<String, ViewerError>>;

/// Pluggable fetch function. Production uses the browser `fetch`; tests
/// substitute a fake.
pub type Fetcher = Rc<dyn Fn(String) -> FetchFuture>;

type SharedFetch = Shared<FetchFuture>;

/// One cache slot. The generation tag lets an awaiter that saw a failure
/// drop exactly the entry it awaited, never a replacement installed in the
/// meantime.
#[derive(Clone)]
struct Entry {
    generation: u64,
    text: SharedFetch,
}

/// Process-wide viewer document cache.
///
/// Cloning is cheap and shares the underlying entries.
#[derive(Clone)]
pub struct ViewerCache {
    entries: Rc<RefCell<HashMap<String, Entry>>>,
    next_generation: Rc<Cell<u64>>,
    fetch: Fetcher,
}

impl ViewerCache {
    /// Create a cache around the given fetch function.
    pub fn new(fetch: Fetcher) -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
            next_generation: Rc::new(Cell::new(0)),
            fetch,
        }
    }

    /// The cache shared by every element instance, backed by the browser
    /// `fetch`.
    #[cfg(target_arch = "wasm32")]
    pub fn shared() -> Self {
        thread_local! {
            static SHARED: ViewerCache = ViewerCache::new(Rc::new(browser_fetch));
        }
        SHARED.with(Clone::clone)
    }

    /// Viewer document text for `location`, fetching on first use.
    ///
    /// Every caller for the same location gets the result of the same
    /// single retrieval, including callers that arrive while it is still in
    /// flight.
    pub async fn viewer_text(&self, location: &str) -> Result<String, ViewerError> {
        let (generation, in_flight) = {
            let mut entries = self.entries.borrow_mut();
            match entries.get(location) {
                Some(entry) => (entry.generation, entry.text.clone()),
                None => {
                    let generation = self.next_generation.get();
                    self.next_generation.set(generation + 1);
                    let text = (self.fetch)(location.to_string()).shared();
                    entries.insert(
                        location.to_string(),
                        Entry {
                            generation,
                            text: text.clone(),
                        },
                    );
                    (generation, text)
                }
            }
        };

        let result = in_flight.await;
        if result.is_err() {
            // Drop the rejected entry, unless a newer fetch already replaced
            // it, so the next request retries instead of replaying the error.
            let mut entries = self.entries.borrow_mut();
            if entries
                .get(location)
                .is_some_and(|entry| entry.generation == generation)
            {
                entries.remove(location);
            }
        }
        result
    }

    /// Number of cached (or in-flight) locations.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(target_arch = "wasm32")]
fn browser_fetch(location: String) -> FetchFuture {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    Box::pin(async move {
        let window = web_sys::window().ok_or_else(|| ViewerError::Fetch {
            location: location.clone(),
            reason: "no window object".to_string(),
        })?;

        let response = JsFuture::from(window.fetch_with_str(&location))
            .await
            .map_err(|err| ViewerError::Fetch {
                location: location.clone(),
                reason: js_reason(&err),
            })?;
        let response: web_sys::Response =
            response.dyn_into().map_err(|_| ViewerError::Fetch {
                location: location.clone(),
                reason: "fetch did not produce a Response".to_string(),
            })?;

        if !response.ok() {
            return Err(ViewerError::Status {
                location,
                status: response.status(),
            });
        }

        let body = response.text().map_err(|err| ViewerError::Fetch {
            location: location.clone(),
            reason: js_reason(&err),
        })?;
        let text = JsFuture::from(body).await.map_err(|err| ViewerError::Fetch {
            location: location.clone(),
            reason: js_reason(&err),
        })?;

        text.as_string().ok_or_else(|| ViewerError::Fetch {
            location,
            reason: "viewer document body was not text".to_string(),
        })
    })
}

#[cfg(target_arch = "wasm32")]
fn js_reason(err: &wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    err.dyn_ref::<js_sys::Error>()
        .map(|error| String::from(error.message()))
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    use super::*;

    const VIEWER_URL: &str = "https://cdn/viewer.html";

    /// Fetcher that counts calls and yields once before resolving, leaving
    /// a window where concurrent requesters see the fetch still in flight.
    fn counting_fetcher(calls: Rc<Cell<usize>>, result: Result<String, ViewerError>) -> Fetcher {
        Rc::new(move |_location| {
            calls.set(calls.get() + 1);
            let result = result.clone();
            Box::pin(async move {
                YieldOnce::default().await;
                result
            })
        })
    }

    #[derive(Default)]
    struct YieldOnce {
        yielded: bool,
    }

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.yielded {
                Poll::Ready(())
            } else {
                self.yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[test]
    fn repeated_requests_fetch_once() {
        let calls = Rc::new(Cell::new(0));
        let cache = ViewerCache::new(counting_fetcher(calls.clone(), Ok("viewer".to_string())));

        let first = block_on(cache.viewer_text(VIEWER_URL)).unwrap();
        let second = block_on(cache.viewer_text(VIEWER_URL)).unwrap();

        assert_eq!(first, "viewer");
        assert_eq!(second, "viewer");
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_requests_share_one_fetch() {
        let calls = Rc::new(Cell::new(0));
        let cache = ViewerCache::new(counting_fetcher(calls.clone(), Ok("viewer".to_string())));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let results = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..4 {
            let cache = cache.clone();
            let results = results.clone();
            spawner
                .spawn_local(async move {
                    let text = cache.viewer_text(VIEWER_URL).await;
                    results.borrow_mut().push(text);
                })
                .unwrap();
        }
        pool.run();

        assert_eq!(calls.get(), 1);
        let results = results.borrow();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|text| text.as_deref() == Ok("viewer")));
    }

    #[test]
    fn distinct_locations_fetch_separately() {
        let calls = Rc::new(Cell::new(0));
        let cache = ViewerCache::new(counting_fetcher(calls.clone(), Ok("viewer".to_string())));

        block_on(cache.viewer_text("https://cdn-a/viewer.html")).unwrap();
        block_on(cache.viewer_text("https://cdn-b/viewer.html")).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_fetch_is_not_retained() {
        let calls = Rc::new(Cell::new(0));
        let failure = ViewerError::Status {
            location: VIEWER_URL.to_string(),
            status: 503,
        };
        let cache = ViewerCache::new(counting_fetcher(calls.clone(), Err(failure.clone())));

        let first = block_on(cache.viewer_text(VIEWER_URL));
        assert_eq!(first, Err(failure.clone()));
        assert!(cache.is_empty());

        let second = block_on(cache.viewer_text(VIEWER_URL));
        assert_eq!(second, Err(failure));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failure_reaches_every_concurrent_requester() {
        let calls = Rc::new(Cell::new(0));
        let failure = ViewerError::Fetch {
            location: VIEWER_URL.to_string(),
            reason: "network unreachable".to_string(),
        };
        let cache = ViewerCache::new(counting_fetcher(calls.clone(), Err(failure.clone())));

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        let results = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..3 {
            let cache = cache.clone();
            let results = results.clone();
            spawner
                .spawn_local(async move {
                    let text = cache.viewer_text(VIEWER_URL).await;
                    results.borrow_mut().push(text);
                })
                .unwrap();
        }
        pool.run();

        assert_eq!(calls.get(), 1);
        let results = results.borrow();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|text| text == &Err(failure.clone())));
    }
}
