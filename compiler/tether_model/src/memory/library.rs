//! Built-in slice of the platform library.
//!
//! Parsed and attributed like workspace sources, but the resulting
//! declarations have no tree in the context, the way classfile symbols
//! have none in a real compiler.

pub(crate) const LIBRARY: &[(&str, &str)] = &[
    (
        "java/lang/Object.java",
        "package java.lang;
public class Object {
    public Object() {}
    public boolean equals(Object other) { return this == other; }
    public int hashCode() { return 0; }
    public String toString() { return null; }
    protected Object clone() throws CloneNotSupportedException { return this; }
}",
    ),
    (
        "java/lang/String.java",
        "package java.lang;
public final class String implements Comparable<String>, CharSequence {
    public String() {}
    public int length() { return 0; }
    public char charAt(int index) { return 'a'; }
    public int compareTo(String other) { return 0; }
    public String substring(int begin, int end) { return this; }
}",
    ),
    (
        "java/lang/CharSequence.java",
        "package java.lang;
public interface CharSequence {
    int length();
    char charAt(int index);
}",
    ),
    (
        "java/lang/Comparable.java",
        "package java.lang;
public interface Comparable<T> {
    int compareTo(T other);
}",
    ),
    (
        "java/lang/Enum.java",
        "package java.lang;
public abstract class Enum<E extends Enum<E>> implements Comparable<E> {
    protected Enum(String name, int ordinal) {}
    public final String name() { return null; }
    public final int ordinal() { return 0; }
    public final int compareTo(E other) { return 0; }
}",
    ),
    (
        "java/lang/Iterable.java",
        "package java.lang;
public interface Iterable<T> {
}",
    ),
    (
        "java/lang/Number.java",
        "package java.lang;
public abstract class Number {
    public Number() {}
    public abstract int intValue();
}",
    ),
    (
        "java/lang/Integer.java",
        "package java.lang;
public final class Integer extends Number implements Comparable<Integer> {
    public static final int MAX_VALUE = 2147483647;
    public Integer(int value) {}
    public int intValue() { return 0; }
    public int compareTo(Integer other) { return 0; }
    public static Integer valueOf(int value) { return null; }
}",
    ),
    (
        "java/lang/Cloneable.java",
        "package java.lang;
public interface Cloneable {
}",
    ),
    (
        "java/lang/Runnable.java",
        "package java.lang;
public interface Runnable {
    void run();
}",
    ),
    (
        "java/lang/Throwable.java",
        "package java.lang;
public class Throwable {
    public Throwable() {}
    public Throwable(String message) {}
    public String getMessage() { return null; }
}",
    ),
    (
        "java/lang/Exception.java",
        "package java.lang;
public class Exception extends Throwable {
    public Exception() {}
    public Exception(String message) {}
}",
    ),
    (
        "java/lang/RuntimeException.java",
        "package java.lang;
public class RuntimeException extends Exception {
    public RuntimeException() {}
    public RuntimeException(String message) {}
}",
    ),
    (
        "java/lang/CloneNotSupportedException.java",
        "package java.lang;
public class CloneNotSupportedException extends Exception {
    public CloneNotSupportedException() {}
}",
    ),
    (
        "java/lang/Override.java",
        "package java.lang;
public @interface Override {
}",
    ),
    (
        "java/lang/Deprecated.java",
        "package java.lang;
public @interface Deprecated {
}",
    ),
    (
        "java/io/Serializable.java",
        "package java.io;
public interface Serializable {
}",
    ),
    (
        "java/util/Collection.java",
        "package java.util;
public interface Collection<E> extends Iterable<E> {
    int size();
    boolean add(E element);
}",
    ),
    (
        "java/util/List.java",
        "package java.util;
public interface List<E> extends Collection<E> {
    E get(int index);
}",
    ),
    (
        "java/util/ArrayList.java",
        "package java.util;
public class ArrayList<E> implements List<E> {
    public ArrayList() {}
    public int size() { return 0; }
    public boolean add(E element) { return true; }
    public E get(int index) { return null; }
}",
    ),
    (
        "java/util/Map.java",
        "package java.util;
public interface Map<K, V> {
    V get(Object key);
    V put(K key, V value);
    interface Entry<K, V> {
        K getKey();
        V getValue();
    }
}",
    ),
];
