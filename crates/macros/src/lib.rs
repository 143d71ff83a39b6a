extern crate proc_macro;

#[macro_use] extern crate quote;
#[macro_use] extern crate synstructure;

mod domain;
mod from;

decl_derive!([DomainError, attributes(domain)] => domain::derive_error);
decl_derive!([From, attributes(from)] => from::derive_from);
