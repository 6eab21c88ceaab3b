//! Example: Simulated Order
//!
//! Demonstrates: the scenario chain and the suite runner against the
//! in-process shop, no browser required
//!
//! Run with: `cargo run --example simulated_order`

use swagprobe::prelude::*;

const TAXONOMY: Taxonomy = Taxonomy {
    epic: "Demo",
    feature: "Checkout",
    story: "Place an order",
    severity: Severity::Normal,
};

#[tokio::main]
async fn main() -> SwagResult<()> {
    println!("=== Simulated Order Example ===\n");

    // 1. Walk the checkout by hand
    println!("1. Walking the checkout chain...");
    let shop = SimulatedShop::new();
    let settings = PageSettings::default();
    let recorder = TestRecorder::new(None, "simulated order", "demo.simulated_order", &TAXONOMY);
    let mut scenario =
        Scenario::new(PageContext::new(&shop, &settings), recorder).with_seed(Some(7));

    let overview = scenario.overview_page_loaded().await?;
    for product in scenario.picked() {
        println!("   picked {} ({})", product.name, format_price(product.price_cents));
    }
    let summary = overview.summary().await?;
    println!(
        "   subtotal {} + tax {} = {}",
        format_price(summary.subtotal_cents),
        format_price(summary.tax_cents),
        format_price(summary.total_cents)
    );
    overview.finish().await?;

    let complete = CheckoutCompletePage::new(scenario.context());
    complete.assert_loaded().await?;
    println!("   {}", complete.header_text().await?);
    println!("   steps recorded: {}", scenario.steps_taken());

    // 2. Run the whole suite on two workers
    println!("\n2. Running the suite...");
    let factory = SimulatedFactory::default();
    let runner = SuiteRunner::new(&factory, SessionConfig::default(), settings.clone())
        .with_seed(Some(7));
    let results = runner.run_all(&TestCase::all(), 2).await;
    for result in &results {
        println!("   {:<40} {}", result.id, result.status);
    }

    let passed = results.iter().filter(|r| r.passed()).count();
    println!("\n=== {passed}/{} cases passed ===", results.len());
    Ok(())
}
