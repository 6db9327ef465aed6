use chrono::Utc;
use common::{
    DriverId, MenuItemId, Money, OrderId, OrderItemId, RestaurantId, UserId,
};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{LineItem, Order, OrderItem, OrderStatus, PaymentMethod, compute_totals};

fn make_items(n: u32) -> Vec<LineItem> {
    (1..=n)
        .map(|i| LineItem::new(Money::from_minor(1000 * i64::from(i)), (i % 5) + 1))
        .collect()
}

fn make_order_items(n: u32) -> Vec<OrderItem> {
    (1..=n)
        .map(|i| OrderItem {
            id: OrderItemId::new(i64::from(i)),
            order_id: OrderId::new(1),
            menu_item_id: MenuItemId::new(i64::from(i)),
            quantity: (i % 5) + 1,
            unit_price: Money::from_minor(1000 * i64::from(i)),
            special_instructions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .collect()
}

fn bench_compute_totals(c: &mut Criterion) {
    let items = make_items(3);
    c.bench_function("pricing/compute_totals_3_items", |b| {
        b.iter(|| compute_totals(items.iter().copied(), Money::from_minor(5000)));
    });

    let items = make_items(50);
    c.bench_function("pricing/compute_totals_50_items", |b| {
        b.iter(|| compute_totals(items.iter().copied(), Money::from_minor(5000)));
    });
}

fn bench_order_recompute(c: &mut Criterion) {
    let items = make_order_items(50);
    let template = Order {
        id: OrderId::new(1),
        customer_id: UserId::new(1),
        restaurant_id: RestaurantId::new(1),
        driver_id: None::<DriverId>,
        status: OrderStatus::Pending,
        delivery_address: "Jl. Sudirman 5".into(),
        payment_method: PaymentMethod::Cash,
        note: None,
        estimated_time: None,
        cancellation_reason: None,
        subtotal: Money::zero(),
        delivery_fee: Money::from_minor(5000),
        service_fee: Money::zero(),
        total: Money::zero(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    c.bench_function("pricing/order_recompute_50_items", |b| {
        b.iter(|| {
            let mut order = template.clone();
            order.recompute_totals(&items, Utc::now());
            order
        });
    });
}

fn bench_state_machine(c: &mut Criterion) {
    c.bench_function("order/full_status_walk", |b| {
        b.iter(|| {
            let mut status = OrderStatus::Pending;
            for next in [
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Delivering,
                OrderStatus::Completed,
            ] {
                assert!(status.can_transition_to(next));
                status = next;
            }
            status
        });
    });
}

criterion_group!(
    benches,
    bench_compute_totals,
    bench_order_recompute,
    bench_state_machine,
);
criterion_main!(benches);
