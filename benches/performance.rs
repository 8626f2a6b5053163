use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use homefin::core::{LedgerService, ProfileService, TrashService};
use homefin::domain::{Account, AccountKind, ProfileBundle, ProfileKind, Transaction};
use homefin::storage::{load_bundle_from_path, save_bundle_to_path};
use tempfile::tempdir;

fn build_sample_bundle(txn_count: usize) -> ProfileBundle {
    let mut bundle = ProfileService::default_bundle();
    let data = bundle.profile_mut(ProfileKind::Personal);

    let checking = Account::new("Checking", AccountKind::Bank);
    let card = Account::new("Card", AccountKind::CreditCard).with_credit_limit(5_000.0);
    let checking_id = checking.id.clone();
    let card_id = card.id.clone();
    data.accounts.push(checking);
    data.accounts.push(card);

    let groceries = data.categories[2].id.clone();
    let start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for idx in 0..txn_count {
        let date = start_date + Duration::days((idx % 365) as i64);
        let account = if idx % 4 == 0 { &card_id } else { &checking_id };
        let amount = if idx % 10 == 0 {
            1_500.0
        } else {
            -(20.0 + (idx % 80) as f64)
        };
        let txn = Transaction::new(account.clone(), date, format!("Entry {idx}"), amount)
            .with_category(groceries.clone());
        data.transactions.push(txn);
    }
    data.sort_transactions();
    bundle
}

fn bench_bundle_io(c: &mut Criterion) {
    let bundle = build_sample_bundle(black_box(10_000));
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("bench.json");

    c.bench_function("bundle_save_10k", |b| {
        b.iter(|| {
            save_bundle_to_path(&bundle, &file_path).expect("save bundle");
        })
    });

    save_bundle_to_path(&bundle, &file_path).expect("seed");

    c.bench_function("bundle_load_10k", |b| {
        b.iter(|| {
            let loaded = load_bundle_from_path(&file_path).expect("load bundle");
            black_box(loaded);
        })
    });
}

fn bench_derived_figures(c: &mut Criterion) {
    let bundle = build_sample_bundle(black_box(10_000));
    let data = bundle.profile(ProfileKind::Personal);
    let reference = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();

    c.bench_function("balances_10k", |b| {
        b.iter(|| black_box(LedgerService::balances(&data.accounts, &data.transactions)))
    });

    c.bench_function("net_worth_10k", |b| {
        b.iter(|| black_box(LedgerService::net_worth(&data.accounts, &data.transactions)))
    });

    c.bench_function("monthly_trend_12", |b| {
        b.iter(|| {
            black_box(LedgerService::monthly_trend(
                &data.transactions,
                reference,
                12,
            ))
        })
    });
}

fn bench_load_sweep(c: &mut Criterion) {
    let mut bundle = build_sample_bundle(black_box(10_000));
    let trashed_at = Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap();
    let data = bundle.profile_mut(ProfileKind::Personal);
    let ids: Vec<String> = data
        .transactions
        .iter()
        .step_by(3)
        .map(|txn| txn.id.clone())
        .collect();
    TrashService::trash_transactions(data, ids, trashed_at);
    let now = trashed_at + Duration::days(8);

    c.bench_function("sanitize_with_expired_trash", |b| {
        b.iter_batched(
            || bundle.clone(),
            |mut bundle| black_box(ProfileService::sanitize(&mut bundle, now)),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_bundle_io, bench_derived_figures, bench_load_sweep);
criterion_main!(benches);
