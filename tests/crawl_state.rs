use quotely::CrawlState;
use url::Url;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_new_state_is_empty() {
    let mut state = CrawlState::new();

    assert_eq!(state.pending(), 0);
    assert_eq!(state.visited_count(), 0);
    assert!(state.next().is_none());
}

#[test]
fn test_enqueue_rejects_duplicates() {
    let mut state = CrawlState::new();

    assert!(state.enqueue(url("http://quotes.test/page/2/")));
    assert!(!state.enqueue(url("http://quotes.test/page/2/")));
    assert_eq!(state.pending(), 1);
}

#[test]
fn test_enqueue_rejects_equivalent_forms() {
    let mut state = CrawlState::new();

    assert!(state.enqueue(url("http://quotes.test/page/1/")));
    assert!(!state.enqueue(url("https://quotes.test/page/1")));
    assert!(!state.enqueue(url("http://QUOTES.test:80/page/1/#top")));
    assert_eq!(state.pending(), 1);
    assert_eq!(state.visited_count(), 1);
}

#[test]
fn test_queue_is_fifo() {
    let mut state = CrawlState::new();
    for n in 1..=3 {
        state.enqueue(url(&format!("http://quotes.test/page/{}/", n)));
    }

    let order: Vec<String> = std::iter::from_fn(|| state.next())
        .map(|u| u.path().to_string())
        .collect();

    assert_eq!(order, vec!["/page/1/", "/page/2/", "/page/3/"]);
}

#[test]
fn test_dequeued_links_stay_visited() {
    let mut state = CrawlState::new();
    let link = url("http://quotes.test/page/1/");

    state.enqueue(link.clone());
    assert_eq!(state.next(), Some(link.clone()));

    assert!(!state.enqueue(link));
    assert_eq!(state.pending(), 0);
}

#[test]
fn test_redirect_to_new_page_is_claimed() {
    let mut state = CrawlState::new();
    let alias = url("http://quotes.test/alias/");
    let target = url("http://quotes.test/page/2/");
    state.enqueue(alias.clone());

    assert!(state.claim_served_url(&alias, &target));
    assert!(!state.enqueue(target));
    assert_eq!(state.visited_count(), 2);
}

#[test]
fn test_redirect_to_admitted_page_is_rejected() {
    let mut state = CrawlState::new();
    let alias = url("http://quotes.test/alias/");
    let target = url("http://quotes.test/page/2/");
    state.enqueue(target.clone());
    state.enqueue(alias.clone());

    assert!(!state.claim_served_url(&alias, &url("https://quotes.test/page/2")));
    assert!(!state.claim_served_url(&alias, &target));
}

#[test]
fn test_redirect_to_equivalent_url_is_kept() {
    let mut state = CrawlState::new();
    let requested = url("http://quotes.test/page/1");
    state.enqueue(requested.clone());

    // Same dedup key, e.g. a trailing-slash or https redirect
    assert!(state.claim_served_url(&requested, &url("https://quotes.test/page/1/")));
    assert_eq!(state.visited_count(), 1);
}

#[test]
fn test_clear_pending_keeps_visited() {
    let mut state = CrawlState::new();
    state.enqueue(url("http://quotes.test/page/1/"));
    state.enqueue(url("http://quotes.test/page/2/"));

    assert_eq!(state.clear_pending(), 2);
    assert_eq!(state.pending(), 0);
    assert_eq!(state.visited_count(), 2);
}
