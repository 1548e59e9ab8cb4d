//! Integration tests for competing rentals on the same stock

use stockhire_engine::{EngineResult, ErrorKind};

mod common;

use common::{remove_db_files, setup, setup_file, temp_db_path};

#[tokio::test]
async fn test_competing_creates_in_one_pool() {
    let h = setup().await;
    let marquee = h.add_stock("Marquee", 10, 2500).await;

    let first = h.rent_request("2024-01-10", &[(marquee.id.as_str(), 6)]);
    let second = h.rent_request("2024-01-11", &[(marquee.id.as_str(), 6)]);

    let (a, b) = tokio::join!(
        h.engine.create_rental(&first),
        h.engine.create_rental(&second)
    );

    assert_one_winner(&[a.map(|_| ()), b.map(|_| ())]);
    assert_eq!(h.quantity(&marquee.id).await, 4);
    assert_eq!(h.engine.list_rentals(&Default::default()).await.unwrap().total, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_competing_creates_on_separate_connections() {
    let path = temp_db_path();
    let h = setup_file(&path, 4).await;
    let marquee = h.add_stock("Marquee", 10, 2500).await;

    let mut tasks = Vec::new();
    for deadline in ["2024-01-10", "2024-01-11"] {
        let engine = h.engine.clone();
        let request = h.rent_request(deadline, &[(marquee.id.as_str(), 6)]);
        tasks.push(tokio::spawn(async move {
            engine.create_rental(&request).await.map(|_| ())
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.expect("create task panicked"));
    }

    assert_one_winner(&results);
    assert_eq!(h.quantity(&marquee.id).await, 4);

    h.engine.db().close().await;
    remove_db_files(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_creates_on_separate_connections() {
    let path = temp_db_path();
    let h = setup_file(&path, 8).await;
    let marquee = h.add_stock("Marquee", 10, 2500).await;

    let mut tasks = Vec::new();
    for day in 10..16 {
        let engine = h.engine.clone();
        let request = h.rent_request(&format!("2024-01-{}", day), &[(marquee.id.as_str(), 6)]);
        tasks.push(tokio::spawn(async move {
            engine.create_rental(&request).await.map(|_| ())
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.expect("create task panicked"));
    }

    assert_one_winner(&results);
    assert_eq!(h.quantity(&marquee.id).await, 4);

    h.engine.db().close().await;
    remove_db_files(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_return_racing_return_settles_once() {
    let path = temp_db_path();
    let h = setup_file(&path, 4).await;
    let tent = h.add_stock("Dome Tent", 10, 500).await;
    let rental = h.rent("2024-01-10", &[(tent.id.as_str(), 3)]).await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let engine = h.engine.clone();
        let request = common::return_request(&rental.id, None);
        tasks.push(tokio::spawn(async move {
            engine.return_rental(&request).await.map(|_| ())
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.expect("return task panicked"));
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(Result::err).unwrap();
    assert_eq!(loser.kind(), ErrorKind::AlreadyReturned, "{}", loser);

    assert_eq!(h.quantity(&tent.id).await, 10);
    assert_eq!(
        h.engine.db().rentals().history_count(&rental.id).await.unwrap(),
        1
    );

    h.engine.db().close().await;
    remove_db_files(&path);
}

fn assert_one_winner(results: &[EngineResult<()>]) {
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "{:?}", results);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), ErrorKind::InsufficientStock, "{}", err);
    }
}
