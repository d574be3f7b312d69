//! Writes `sample_comments.csv`: free-text comments with a few numeric and
//! empty cells, for trying the annotator by hand.

use anyhow::{Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let people = ["Barack Obama", "Marie Curie", "Ada Lovelace", "Lionel Messi", "Angela Merkel"];
    let places = ["Paris", "Berlin", "Istanbul", "Buenos Aires", "Nairobi", "Tokyo"];
    let orgs = ["the United Nations", "CERN", "Google", "FC Barcelona", "the World Bank"];
    let templates = [
        "{person} visited {place} last week.",
        "{person} gave a talk at {org} in {place}.",
        "Customer says the delivery to {place} was late again.",
        "{org} opened a new office in {place}.",
        "Great service, thanks {person}!",
    ];

    let output_path = "sample_comments.csv";
    let mut writer = csv::Writer::from_path(output_path).context("creating output file")?;
    writer.write_record(["id", "comment", "rating"])?;

    let rows = 40;
    for id in 0..rows {
        let comment = if id % 13 == 12 {
            String::new()
        } else {
            rng.pick(&templates)
                .replace("{person}", rng.pick(&people))
                .replace("{place}", rng.pick(&places))
                .replace("{org}", rng.pick(&orgs))
        };
        let rating = 1 + rng.next_u64() % 5;
        writer.write_record([id.to_string(), comment, rating.to_string()])?;
    }
    writer.flush()?;

    println!("Wrote {rows} comments to {output_path}");
    Ok(())
}
