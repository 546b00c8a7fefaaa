// 🧪 Test fixture - A small, hand-checked season of pitches
//
// Sharks: 1 Mark, 2 Lori, 3 Kevin, 4 Gwen (guest by default)
// Episodes: (1,1) (1,2) (2,1)
// Companies: 10 Bakery/Food, 11 Gadget/Tech, 12 Snack/Food,
//            13 Gym/Fitness, 14 App/Tech, 15 Juice/Food
// Investments: 101 (1,1,10) 102 (1,1,11) 103 (1,2,13, declined)
//              104 (2,1,15) 105 (2,1,10)

use crate::dataset::{MemoryDataset, Table};
use crate::table::Scalar;

fn int(v: i64) -> Scalar {
    Scalar::Int(v)
}

fn num(v: f64) -> Scalar {
    Scalar::Float(v)
}

fn text(v: &str) -> Scalar {
    Scalar::from(v)
}

pub fn shark(ds: &mut MemoryDataset, id: i64, name: &str, guest: bool) {
    ds.push(
        Table::Shark,
        &[
            ("shark_id", int(id)),
            ("shark_name", text(name)),
            ("is_guest", Scalar::Bool(guest)),
        ],
    );
}

pub fn company(ds: &mut MemoryDataset, id: i64, name: &str, industry: &str) {
    ds.push(
        Table::Company,
        &[
            ("company_id", int(id)),
            ("company_name", text(name)),
            ("industry_name", text(industry)),
        ],
    );
}

pub fn episode(ds: &mut MemoryDataset, season: i64, episode: i64) {
    ds.push(
        Table::Episode,
        &[("season_id", int(season)), ("episode_id", int(episode))],
    );
}

pub fn ask(ds: &mut MemoryDataset, season: i64, episode: i64, company: i64, amount: Option<f64>, share: f64) {
    ds.push(
        Table::Ask,
        &[
            ("season_id", int(season)),
            ("episode_id", int(episode)),
            ("company_id", int(company)),
            ("equity_amount", Scalar::from(amount)),
            ("equity_share", num(share)),
        ],
    );
}

#[allow(clippy::too_many_arguments)]
pub fn investment(
    ds: &mut MemoryDataset,
    id: i64,
    season: i64,
    episode: i64,
    company: i64,
    amount: f64,
    share: f64,
    accepted: bool,
) {
    ds.push(
        Table::Investment,
        &[
            ("investment_id", int(id)),
            ("season_id", int(season)),
            ("episode_id", int(episode)),
            ("company_id", int(company)),
            ("equity_amount", num(amount)),
            ("equity_share", num(share)),
            ("accepted", Scalar::Bool(accepted)),
        ],
    );
}

pub fn contribute(ds: &mut MemoryDataset, investment: i64, shark: i64, amount: f64) {
    ds.push(
        Table::Contribute,
        &[
            ("investment_id", int(investment)),
            ("shark_id", int(shark)),
            ("equity_amount", num(amount)),
        ],
    );
}

pub fn judge(ds: &mut MemoryDataset, season: i64, episode: i64, shark: i64) {
    ds.push(
        Table::Judge,
        &[
            ("season_id", int(season)),
            ("episode_id", int(episode)),
            ("shark_id", int(shark)),
        ],
    );
}

pub fn entrepreneur(ds: &mut MemoryDataset, id: i64, name: &str, city: &str, state: &str) {
    ds.push(
        Table::Entrepreneur,
        &[
            ("entrepreneur_id", int(id)),
            ("entrepreneur_name", text(name)),
            ("location_city", text(city)),
            ("location_state", text(state)),
        ],
    );
}

pub fn own(ds: &mut MemoryDataset, company: i64, entrepreneur: i64) {
    ds.push(
        Table::Own,
        &[("company_id", int(company)), ("entrepreneur_id", int(entrepreneur))],
    );
}

pub fn fixture() -> MemoryDataset {
    let mut ds = MemoryDataset::new();

    for name in ["Food", "Tech", "Fitness"] {
        ds.push(Table::Industry, &[("industry_name", text(name))]);
    }
    for season in [1, 2] {
        ds.push(Table::Season, &[("season_id", int(season))]);
    }

    shark(&mut ds, 1, "Mark", false);
    shark(&mut ds, 2, "Lori", false);
    shark(&mut ds, 3, "Kevin", false);
    shark(&mut ds, 4, "Gwen", true);

    episode(&mut ds, 1, 1);
    episode(&mut ds, 1, 2);
    episode(&mut ds, 2, 1);

    company(&mut ds, 10, "Bakery", "Food");
    company(&mut ds, 11, "Gadget", "Tech");
    company(&mut ds, 12, "Snack", "Food");
    company(&mut ds, 13, "Gym", "Fitness");
    company(&mut ds, 14, "App", "Tech");
    company(&mut ds, 15, "Juice", "Food");

    ask(&mut ds, 1, 1, 10, Some(100_000.0), 10.0);
    ask(&mut ds, 1, 1, 11, Some(200_000.0), 20.0);
    ask(&mut ds, 1, 1, 12, None, 5.0);
    ask(&mut ds, 1, 2, 13, Some(80_000.0), 10.0);
    ask(&mut ds, 1, 2, 14, Some(500_000.0), 25.0);
    ask(&mut ds, 2, 1, 15, Some(150_000.0), 15.0);
    ask(&mut ds, 2, 1, 10, Some(120_000.0), 10.0);

    investment(&mut ds, 101, 1, 1, 10, 100_000.0, 20.0, true);
    investment(&mut ds, 102, 1, 1, 11, 200_000.0, 40.0, true);
    investment(&mut ds, 103, 1, 2, 13, 80_000.0, 10.0, false);
    investment(&mut ds, 104, 2, 1, 15, 150_000.0, 30.0, true);
    investment(&mut ds, 105, 2, 1, 10, 60_000.0, 10.0, true);

    contribute(&mut ds, 101, 1, 50_000.0);
    contribute(&mut ds, 101, 2, 50_000.0);
    contribute(&mut ds, 102, 1, 100_000.0);
    contribute(&mut ds, 102, 2, 50_000.0);
    contribute(&mut ds, 102, 3, 50_000.0);
    contribute(&mut ds, 103, 3, 80_000.0);
    contribute(&mut ds, 104, 4, 150_000.0);
    contribute(&mut ds, 105, 1, 30_000.0);
    contribute(&mut ds, 105, 2, 30_000.0);

    for shark_id in [1, 2, 3] {
        judge(&mut ds, 1, 1, shark_id);
        judge(&mut ds, 1, 2, shark_id);
    }
    for shark_id in [1, 2, 4] {
        judge(&mut ds, 2, 1, shark_id);
    }

    entrepreneur(&mut ds, 1, "Ann", "Austin", "TX");
    entrepreneur(&mut ds, 2, "Bob", "Austin", "TX");
    entrepreneur(&mut ds, 3, "Cat", "Denver", "CO");
    entrepreneur(&mut ds, 4, "Dan", "Austin", "TX");

    own(&mut ds, 10, 1);
    own(&mut ds, 11, 2);
    own(&mut ds, 12, 3);
    own(&mut ds, 13, 4);
    own(&mut ds, 14, 1);
    own(&mut ds, 15, 3);

    ds
}

/// Float cell within 1e-6 of `expected`
pub fn assert_close(cell: Option<&Scalar>, expected: f64) {
    match cell.and_then(|c| c.as_f64()) {
        Some(v) => assert!(
            (v - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            v
        ),
        None => panic!("expected {}, got {:?}", expected, cell),
    }
}
