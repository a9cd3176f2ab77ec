use ipset_cmd::{Error, IpSet, Params};

fn walk_through() -> Result<(), Error> {
    let set = IpSet::new("test", "hash:ip", Params::default())?;

    set.add("192.168.3.1", 0)?;
    println!("add ok");

    let exists = set.test("192.168.3.1")?;
    println!("test {}", exists);

    for entry in set.list()? {
        println!("list {}", entry);
    }

    let report = set.refresh(["10.0.0.1", "10.0.0.2"])?;
    println!("refresh added {} skipped {}", report.added, report.skipped.len());

    let stats = set.statistics()?;
    println!("stats {} entries in {} bytes", stats.entries, stats.size_in_memory);

    set.flush()?;
    println!("flush ok");

    set.destroy()?;
    println!("destroy ok");

    Ok(())
}

fn main() {
    if let Err(err) = walk_through() {
        println!("usage failed:{:?}", err);
    }
}
